// src/control.rs

//! Game/UI-thread side of the engine: trigger API, pattern and level events,
//! and the live parameter table.

use crate::assets::SampleBank;
use crate::audio_engine::command::{AudioCommand, COMMAND_QUEUE_CAPACITY};
use crate::audio_engine::instruments::{Hit, HitTriggers};
use crate::audio_engine::scope::{scope_channel, ScopeReader, SCOPE_CAPACITY};
use crate::audio_engine::{AudioEngine, EngineConfig, EngineStats};
use crate::params::SharedParams;
use crate::pattern::PatternSet;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use ringbuf::{HeapProducer, HeapRb};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_RANDOM_SAMPLE_COOLDOWN: Duration = Duration::from_millis(500);

/// Voices `play_random_sample` picks from, in round-robin order.
const RANDOM_HITS: [Hit; 3] = [Hit::Hi, Hit::Mid, Hit::Low];

/// A timer that blocks an action for a fixed period after it fires.
/// Advanced explicitly by the caller's frame delta.
#[derive(Debug, Clone)]
pub struct Cooldown {
    period: Duration,
    remaining: Duration,
}

impl Cooldown {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            remaining: Duration::ZERO,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.remaining.is_zero()
    }

    /// Starts the cooldown if ready. Returns whether the action may fire.
    pub fn try_fire(&mut self) -> bool {
        if !self.is_ready() {
            return false;
        }
        self.remaining = self.period;
        true
    }

    pub fn advance(&mut self, dt: Duration) {
        self.remaining = self.remaining.saturating_sub(dt);
    }
}

/// Picks hits for `play_random_sample`: the first pass walks the voices in
/// order, after that each pick is uniform.
#[derive(Debug)]
struct RandomHitPicker {
    calls: usize,
    rng: StdRng,
}

impl RandomHitPicker {
    fn new() -> Self {
        Self {
            calls: 0,
            rng: StdRng::from_entropy(),
        }
    }

    fn next(&mut self) -> Hit {
        let hit = if self.calls < RANDOM_HITS.len() {
            RANDOM_HITS[self.calls]
        } else {
            RANDOM_HITS[self.rng.gen_range(0..RANDOM_HITS.len())]
        };
        self.calls = self.calls.saturating_add(1);
        hit
    }
}

pub struct AudioHandle {
    commands: HeapProducer<AudioCommand>,
    params: Arc<SharedParams>,
    hits: Arc<HitTriggers>,
    stats: Arc<EngineStats>,
    pattern_count: usize,
    random_cooldown: Cooldown,
    random_picker: RandomHitPicker,
    reported_ignored: u32,
}

/// Builds an engine and the handle that drives it. The engine goes to the audio
/// thread; the handle and scope reader stay with the game loop.
pub fn connect(
    config: &EngineConfig,
    bank: &SampleBank,
    params: Arc<SharedParams>,
    random_cooldown: Duration,
) -> (AudioEngine, AudioHandle, ScopeReader) {
    let (producer, consumer) = HeapRb::<AudioCommand>::new(COMMAND_QUEUE_CAPACITY).split();
    let (scope_writer, scope_reader) = scope_channel(SCOPE_CAPACITY);
    let hits = Arc::new(HitTriggers::default());
    let stats = Arc::new(EngineStats::default());

    let engine = AudioEngine::new(
        config,
        bank,
        consumer,
        params.clone(),
        hits.clone(),
        stats.clone(),
        scope_writer,
    );
    info!(
        sample_rate = config.sample_rate,
        tempo = config.tempo_bpm,
        ticks_per_beat = config.ticks_per_beat,
        taps = ?engine.reverb_tap_seconds(),
        "Audio engine ready"
    );

    let handle = AudioHandle {
        commands: producer,
        params,
        hits,
        stats,
        pattern_count: PatternSet::builtin().len(),
        random_cooldown: Cooldown::new(random_cooldown),
        random_picker: RandomHitPicker::new(),
        reported_ignored: 0,
    };
    (engine, handle, scope_reader)
}

impl AudioHandle {
    pub fn params(&self) -> &Arc<SharedParams> {
        &self.params
    }

    pub fn stats(&self) -> &Arc<EngineStats> {
        &self.stats
    }

    pub fn pattern_count(&self) -> usize {
        self.pattern_count
    }

    /// Fires a hit directly. It sounds from the next rendered frame.
    pub fn trigger(&self, hit: Hit) {
        self.hits.fire(hit);
    }

    /// Keys '1' to '4' fire the hi, mid, low and sub hits. Returns whether the
    /// key was bound.
    pub fn key_pressed(&self, key: char) -> bool {
        match Hit::from_key(key) {
            Some(hit) => {
                debug!(%hit, "Key trigger");
                self.trigger(hit);
                true
            }
            None => false,
        }
    }

    /// Fires one of the hi/mid/low hits unless a previous call is still cooling down.
    pub fn play_random_sample(&mut self) -> Option<Hit> {
        if !self.random_cooldown.try_fire() {
            return None;
        }
        let hit = self.random_picker.next();
        debug!(%hit, "Random sample");
        self.trigger(hit);
        Some(hit)
    }

    /// Per-frame housekeeping: advances the random-sample cooldown and reports
    /// anything the audio thread had to ignore.
    pub fn update(&mut self, dt: Duration) {
        self.random_cooldown.advance(dt);
        let ignored = self.stats.ignored_commands.load(Ordering::Relaxed);
        if ignored > self.reported_ignored {
            warn!(
                count = ignored - self.reported_ignored,
                "Audio thread ignored invalid commands"
            );
            self.reported_ignored = ignored;
        }
    }

    /// Selects a pattern set. Indices past the built-in sets are ignored.
    pub fn set_pattern(&mut self, index: usize) -> bool {
        if index >= self.pattern_count {
            warn!(
                index,
                available = self.pattern_count,
                "Pattern index out of range, keeping current pattern"
            );
            return false;
        }
        self.send(AudioCommand::SetPattern(index))
    }

    pub fn event_new_level_loaded(&mut self) -> bool {
        info!("New level loaded");
        self.send(AudioCommand::NewLevelLoaded)
    }

    pub fn event_level_complete(&mut self) -> bool {
        info!("Level complete");
        self.send(AudioCommand::LevelComplete)
    }

    pub fn set_tempo(&mut self, bpm: f64) -> bool {
        if !bpm.is_finite() || bpm <= 0.0 {
            warn!(bpm, "Ignoring non-positive tempo");
            return false;
        }
        self.send(AudioCommand::SetTempo(bpm))
    }

    pub fn set_ticks_per_beat(&mut self, ticks: u32) -> bool {
        if ticks == 0 {
            warn!("Ignoring zero ticks per beat");
            return false;
        }
        self.send(AudioCommand::SetTicksPerBeat(ticks))
    }

    pub fn reset_transport(&mut self) -> bool {
        self.send(AudioCommand::ResetTransport)
    }

    fn send(&mut self, command: AudioCommand) -> bool {
        if self.commands.push(command).is_err() {
            warn!(?command, "Audio command queue full, command dropped");
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle() -> (AudioEngine, AudioHandle) {
        let config = EngineConfig {
            reverb_seed: Some(5),
            ..EngineConfig::default()
        };
        let (engine, handle, _scope) = connect(
            &config,
            &SampleBank::empty(),
            Arc::new(SharedParams::new()),
            DEFAULT_RANDOM_SAMPLE_COOLDOWN,
        );
        (engine, handle)
    }

    #[test]
    fn test_cooldown() {
        let mut cooldown = Cooldown::new(Duration::from_millis(500));
        assert!(cooldown.try_fire());
        assert!(!cooldown.try_fire());
        cooldown.advance(Duration::from_millis(499));
        assert!(!cooldown.try_fire());
        cooldown.advance(Duration::from_millis(1));
        assert!(cooldown.try_fire());
    }

    #[test]
    fn test_random_sample_round_robin_then_random() {
        let (_engine, mut handle) = handle();
        let frame = Duration::from_millis(600);
        let mut picks = Vec::new();
        for _ in 0..20 {
            picks.push(handle.play_random_sample().unwrap());
            handle.update(frame);
        }
        assert_eq!(&picks[..3], &[Hit::Hi, Hit::Mid, Hit::Low]);
        assert!(picks.iter().all(|h| RANDOM_HITS.contains(h)));
    }

    #[test]
    fn test_random_sample_is_debounced() {
        let (_engine, mut handle) = handle();
        assert_eq!(handle.play_random_sample(), Some(Hit::Hi));
        // About 30 frames at 60 fps have to pass.
        for _ in 0..29 {
            handle.update(Duration::from_micros(16_667));
            assert_eq!(handle.play_random_sample(), None);
        }
        handle.update(Duration::from_micros(16_667));
        assert_eq!(handle.play_random_sample(), Some(Hit::Mid));
    }

    #[test]
    fn test_key_pressed_fires_bound_hits() {
        let (_engine, handle) = handle();
        assert!(handle.key_pressed('3'));
        assert!(handle.hits.is_pending(Hit::Low));
        assert!(!handle.key_pressed('x'));
    }

    #[test]
    fn test_out_of_range_pattern_is_not_sent() {
        let (mut engine, mut handle) = handle();
        assert!(!handle.set_pattern(handle.pattern_count()));
        assert!(handle.set_pattern(1));
        engine.handle_commands();
        assert_eq!(handle.stats().active_set.load(Ordering::Relaxed), 1);
        assert_eq!(handle.stats().ignored_commands.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_invalid_tempo_is_rejected() {
        let (_engine, mut handle) = handle();
        assert!(!handle.set_tempo(0.0));
        assert!(!handle.set_tempo(f64::INFINITY));
        assert!(!handle.set_ticks_per_beat(0));
        assert!(handle.set_tempo(120.0));
    }

    #[test]
    fn test_full_queue_drops_commands() {
        let (_engine, mut handle) = handle();
        let sent = (0..COMMAND_QUEUE_CAPACITY + 10)
            .filter(|_| handle.event_new_level_loaded())
            .count();
        assert_eq!(sent, COMMAND_QUEUE_CAPACITY);
    }
}
