// src/audio_engine.rs

pub mod command;
pub mod instruments;
pub mod scope;

use self::command::AudioCommand;
use self::instruments::{Hit, HitTriggers, Instruments, ATMOS_PAN_HZ, METRONOME_PAN};
use self::scope::{ScopeFrame, ScopeWriter};
use crate::assets::SampleBank;
use crate::clock::{Clock, DEFAULT_TEMPO_BPM, DEFAULT_TICKS_PER_BEAT};
use crate::fx_chain::{FxChain, FxSettings};
use crate::mixer::MixBus;
use crate::oscillator::SineOsc;
use crate::params::{FrameParams, SharedParams};
use crate::sequencer::{ActiveSet, Sequencer, StepTriggers};
use ringbuf::HeapConsumer;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

pub const DEFAULT_SAMPLE_RATE: u32 = 44100;
pub const DEFAULT_BUFFER_SIZE: u32 = 512;

/// Sentinel stored in `EngineStats::active_set` while the completion patterns play.
pub const COMPLETE_SET_INDEX: u32 = u32::MAX;

/// Fixed engine setup, decided before the stream starts.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub sample_rate: u32,
    pub tempo_bpm: f64,
    pub ticks_per_beat: u32,
    /// Seeds the reverb tap times. `None` draws them from system entropy.
    pub reverb_seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            tempo_bpm: DEFAULT_TEMPO_BPM,
            ticks_per_beat: DEFAULT_TICKS_PER_BEAT,
            reverb_seed: None,
        }
    }
}

/// Counters the audio thread publishes for the control side to read and log.
#[derive(Debug, Default)]
pub struct EngineStats {
    pub callbacks: AtomicU64,
    pub frames_rendered: AtomicU64,
    pub play_head: AtomicU64,
    pub active_set: AtomicU32,
    pub ignored_commands: AtomicU32,
    /// Share of the buffer period the last callback took, scaled by 1000.
    pub cpu_load: AtomicU32,
}

impl EngineStats {
    pub fn cpu_load(&self) -> f32 {
        self.cpu_load.load(Ordering::Relaxed) as f32 / 1000.0
    }
}

pub struct AudioEngine {
    command_consumer: HeapConsumer<AudioCommand>,
    params: Arc<SharedParams>,
    hit_triggers: Arc<HitTriggers>,
    stats: Arc<EngineStats>,
    scope: ScopeWriter,
    clock: Clock,
    sequencer: Sequencer,
    voices: Instruments,
    fx: FxChain,
    dry_bus: MixBus,
    ambient_bus: MixBus,
    cell_osc: SineOsc,
    sample_rate: f32,
}

impl AudioEngine {
    pub fn new(
        config: &EngineConfig,
        bank: &SampleBank,
        command_consumer: HeapConsumer<AudioCommand>,
        params: Arc<SharedParams>,
        hit_triggers: Arc<HitTriggers>,
        stats: Arc<EngineStats>,
        scope: ScopeWriter,
    ) -> Self {
        let sample_rate = config.sample_rate.max(1) as f32;
        let mut clock = Clock::new(sample_rate);
        clock.set_tempo(config.tempo_bpm);
        clock.set_ticks_per_beat(config.ticks_per_beat);

        Self {
            command_consumer,
            params,
            hit_triggers,
            stats,
            scope,
            clock,
            sequencer: Sequencer::with_builtin_sets(),
            voices: Instruments::new(bank, sample_rate),
            fx: FxChain::with_random_taps(sample_rate, config.reverb_seed),
            dry_bus: MixBus::default(),
            ambient_bus: MixBus::default(),
            cell_osc: SineOsc::new(sample_rate),
            sample_rate,
        }
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn reverb_tap_seconds(&self) -> &[f32] {
        self.fx.tap_seconds()
    }

    pub fn handle_commands(&mut self) {
        while let Some(command) = self.command_consumer.pop() {
            match command {
                AudioCommand::SetPattern(index) => {
                    if !self.sequencer.set_pattern(index) {
                        self.stats.ignored_commands.fetch_add(1, Ordering::Relaxed);
                    }
                }
                AudioCommand::NewLevelLoaded => {
                    self.sequencer.next_set();
                    self.hit_triggers.fire(Hit::Low);
                }
                AudioCommand::LevelComplete => {
                    self.sequencer.enter_complete();
                    self.hit_triggers.fire(Hit::Sub);
                }
                AudioCommand::SetTempo(bpm) => {
                    if !self.clock.set_tempo(bpm) {
                        self.stats.ignored_commands.fetch_add(1, Ordering::Relaxed);
                    }
                }
                AudioCommand::SetTicksPerBeat(ticks) => {
                    if !self.clock.set_ticks_per_beat(ticks) {
                        self.stats.ignored_commands.fetch_add(1, Ordering::Relaxed);
                    }
                }
                AudioCommand::ResetTransport => {
                    self.clock.reset();
                    self.sequencer.reset_transport();
                }
            }
        }
        let active = match self.sequencer.active() {
            ActiveSet::Builtin(index) => index as u32,
            ActiveSet::Complete => COMPLETE_SET_INDEX,
        };
        self.stats.active_set.store(active, Ordering::Relaxed);
    }

    /// Fills an interleaved buffer of `output.len() / channels` frames. The first
    /// two channels carry left and right, extra channels are silent and a mono
    /// output gets the average. Never allocates.
    pub fn audio_out(&mut self, output: &mut [f32], channels: usize) {
        let start = Instant::now();
        self.handle_commands();

        let channels = channels.max(1);
        let mut frames = 0u64;
        for frame in output.chunks_mut(channels) {
            let params = self.params.frame();
            let [left, right] = self.render_frame(&params);
            match frame {
                [mono] => *mono = 0.5 * (left + right),
                [l, r, rest @ ..] => {
                    *l = left;
                    *r = right;
                    rest.iter_mut().for_each(|s| *s = 0.0);
                }
                [] => {}
            }
            frames += 1;
        }

        self.stats.callbacks.fetch_add(1, Ordering::Relaxed);
        self.stats.frames_rendered.fetch_add(frames, Ordering::Relaxed);
        self.stats
            .play_head
            .store(self.sequencer.play_head(), Ordering::Relaxed);
        if frames > 0 {
            let budget = frames as f32 / self.sample_rate;
            let load = start.elapsed().as_secs_f32() / budget;
            self.stats
                .cpu_load
                .store((load * 1000.0) as u32, Ordering::Relaxed);
        }
    }

    #[inline]
    fn render_frame(&mut self, p: &FrameParams) -> [f32; 2] {
        self.dry_bus.clear();
        self.ambient_bus.clear();

        // Triggers live for this frame only.
        let steps = if self.clock.ticker() {
            self.sequencer.tick()
        } else {
            StepTriggers::default()
        };
        let hit_triggers = Hit::ALL.map(|hit| self.hit_triggers.take(hit));

        let voices = &mut self.voices;

        let metronome = voices
            .metronome
            .render(self.sequencer.metronome_speed(), steps.metronome)
            * p.metronome_gain;
        self.dry_bus.add_panned(metronome, METRONOME_PAN);

        let key_arp = voices.key_arp.render(1.0, steps.key_arp) * p.key_loop_gain;
        self.dry_bus.add_panned(key_arp, p.key_loop_pan);
        let key_hi = voices.key_hi.render(1.0, steps.key_hi) * p.key_hi_gain;
        self.dry_bus.add_panned(key_hi, p.key_hi_pan);
        let key_low = voices.key_low.render(1.0, steps.key_low) * p.key_low_gain;
        self.dry_bus.add_panned(key_low, p.key_low_pan);

        let bass = voices
            .bass
            .render(self.sequencer.bass_frequency(), steps.bass)
            * p.synth_line_gain;
        self.dry_bus.add_panned(bass, p.synth_line_pan);

        let mut hit_sum = 0.0;
        for (hit, voice) in Hit::ALL.iter().zip(voices.hits.iter_mut()) {
            let value = voice.render(1.0, hit_triggers[hit.index()]);
            hit_sum += value;
            self.dry_bus.add_panned(value, hit.pan());
        }

        let atmos = voices.atmos.play(1.0) * p.atmos_gain;
        let atmos_pan = voices.atmos_panner.unipolar(ATMOS_PAN_HZ);
        self.ambient_bus.add_panned(atmos, atmos_pan);

        let wet = self
            .fx
            .process(self.dry_bus.as_array(), &FxSettings::from(p));

        self.scope.push(ScopeFrame {
            cell: self.cell_osc.sinewave(p.cell_speed),
            hits: hit_sum,
        });

        [
            (wet[0] + self.ambient_bus.left) * p.master_gain,
            (wet[1] + self.ambient_bus.right) * p.master_gain,
        ]
    }
}
