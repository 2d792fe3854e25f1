// src/mixer.rs

//! Per-voice rendering and the stereo mix bus.

use crate::envelope::{Envelope, EnvelopeSettings};
use crate::oscillator::SineOsc;
use crate::sample_buffer::SampleBuffer;
use crate::sample_player::SamplePlayer;

/// Constant-power pan. `pan` runs from 0.0 (left) to 1.0 (right).
#[inline]
pub fn pan(value: f32, pan: f32) -> [f32; 2] {
    let pan = if pan.is_nan() { 0.5 } else { pan.clamp(0.0, 1.0) };
    [value * (1.0 - pan).sqrt(), value * pan.sqrt()]
}

/// Stereo accumulator, cleared at the start of every frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MixBus {
    pub left: f32,
    pub right: f32,
}

impl MixBus {
    #[inline]
    pub fn clear(&mut self) {
        self.left = 0.0;
        self.right = 0.0;
    }

    #[inline]
    pub fn add(&mut self, [left, right]: [f32; 2]) {
        self.left += left;
        self.right += right;
    }

    #[inline]
    pub fn add_panned(&mut self, value: f32, pan_position: f32) {
        self.add(pan(value, pan_position));
    }

    pub fn as_array(&self) -> [f32; 2] {
        [self.left, self.right]
    }
}

/// How a sample voice reads its buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Playback {
    /// Plays once per trigger, then stays silent.
    OneShot,
    /// Wraps around and never stops.
    Loop,
}

/// Sample player, envelope and a fixed pre-envelope gain.
#[derive(Debug, Clone)]
pub struct SampleVoice {
    player: SamplePlayer,
    envelope: Envelope,
    pre_gain: f32,
    playback: Playback,
}

impl SampleVoice {
    pub fn new(
        buffer: Option<SampleBuffer>,
        envelope: EnvelopeSettings,
        pre_gain: f32,
        playback: Playback,
        sample_rate: f32,
    ) -> Self {
        let player = match playback {
            Playback::OneShot => SamplePlayer::idle(buffer),
            Playback::Loop => SamplePlayer::new(buffer),
        };
        Self {
            player,
            envelope: Envelope::new(envelope, sample_rate),
            pre_gain,
            playback,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.player.is_loaded()
    }

    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    pub fn player(&self) -> &SamplePlayer {
        &self.player
    }

    /// Renders one sample. A trigger restarts playback at the first sample of the
    /// buffer on this very frame and restarts the envelope attack.
    #[inline]
    pub fn render(&mut self, speed: f32, trigger: bool) -> f32 {
        if trigger {
            self.player.trigger();
        }
        let raw = match self.playback {
            Playback::OneShot => self.player.play_once(speed),
            Playback::Loop => self.player.play(speed),
        };
        self.envelope.process(raw * self.pre_gain, trigger)
    }
}

/// Sine bass voice with its own envelope.
#[derive(Debug, Clone)]
pub struct BassVoice {
    osc: SineOsc,
    envelope: Envelope,
}

impl BassVoice {
    pub fn new(envelope: EnvelopeSettings, sample_rate: f32) -> Self {
        Self {
            osc: SineOsc::new(sample_rate),
            envelope: Envelope::new(envelope, sample_rate),
        }
    }

    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    #[inline]
    pub fn render(&mut self, frequency_hz: f32, trigger: bool) -> f32 {
        let tone = self.osc.sinewave(frequency_hz);
        self.envelope.process(tone, trigger)
    }
}
