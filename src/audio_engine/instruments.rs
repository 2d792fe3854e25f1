// src/audio_engine/instruments.rs

//! The fixed set of instrument voices and the trigger flags the control thread sets.

use crate::assets::{SampleBank, SampleSlot};
use crate::envelope::{EnvelopeSettings, RampShape};
use crate::mixer::{BassVoice, Playback, SampleVoice};
use crate::oscillator::SineOsc;
use crate::sample_player::SamplePlayer;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

/// Auto-pan rate of the atmosphere loop.
pub const ATMOS_PAN_HZ: f32 = 0.01;
pub const METRONOME_PAN: f32 = 0.5;

/// Near-instant attack and a very long release: a soft gate over the sample.
pub fn hit_envelope() -> EnvelopeSettings {
    EnvelopeSettings::adsr(0.2, 5.0, 5.0, 15_000.0)
}

/// Key loops hold for as long as any of them runs between retriggers.
pub fn key_loop_envelope() -> EnvelopeSettings {
    EnvelopeSettings::ar(0.23, 60_000.0, 50.0)
}

pub fn metronome_envelope() -> EnvelopeSettings {
    EnvelopeSettings::ar(0.23, 40.0, 20.0)
}

pub fn bass_envelope() -> EnvelopeSettings {
    EnvelopeSettings::ar(0.45, 113.0, 10.0).with_shape(RampShape::Exponential)
}

/// The four one-shot percussive voices the game can fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hit {
    Hi,
    Mid,
    Low,
    Sub,
}

impl Hit {
    pub const ALL: [Hit; 4] = [Hit::Hi, Hit::Mid, Hit::Low, Hit::Sub];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn slot(self) -> SampleSlot {
        match self {
            Hit::Hi => SampleSlot::HitHi,
            Hit::Mid => SampleSlot::HitMid,
            Hit::Low => SampleSlot::HitLow,
            Hit::Sub => SampleSlot::HitSub,
        }
    }

    pub fn pre_gain(self) -> f32 {
        match self {
            Hit::Sub => 1.5,
            _ => 0.8,
        }
    }

    pub fn pan(self) -> f32 {
        match self {
            Hit::Hi => 0.2,
            Hit::Mid => 0.8,
            Hit::Low => 0.4,
            Hit::Sub => 0.3,
        }
    }

    /// Keyboard binding: '1' to '4'.
    pub fn from_key(key: char) -> Option<Hit> {
        match key {
            '1' => Some(Hit::Hi),
            '2' => Some(Hit::Mid),
            '3' => Some(Hit::Low),
            '4' => Some(Hit::Sub),
            _ => None,
        }
    }
}

impl fmt::Display for Hit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Hit::Hi => "hi",
            Hit::Mid => "mid",
            Hit::Low => "low",
            Hit::Sub => "sub",
        };
        write!(f, "{}", name)
    }
}

/// One flag per hit. The control thread raises a flag, the audio thread takes it
/// on the next frame and clears it.
#[derive(Debug, Default)]
pub struct HitTriggers {
    flags: [AtomicBool; 4],
}

impl HitTriggers {
    pub fn fire(&self, hit: Hit) {
        self.flags[hit.index()].store(true, Ordering::Release);
    }

    #[inline]
    pub fn take(&self, hit: Hit) -> bool {
        self.flags[hit.index()].swap(false, Ordering::AcqRel)
    }

    pub fn is_pending(&self, hit: Hit) -> bool {
        self.flags[hit.index()].load(Ordering::Acquire)
    }
}

/// Every voice the engine renders, each owned by exactly one instrument slot.
#[derive(Debug, Clone)]
pub struct Instruments {
    pub metronome: SampleVoice,
    pub hits: [SampleVoice; 4],
    pub key_arp: SampleVoice,
    pub key_hi: SampleVoice,
    pub key_low: SampleVoice,
    pub bass: BassVoice,
    pub atmos: SamplePlayer,
    pub atmos_panner: SineOsc,
}

impl Instruments {
    pub fn new(bank: &SampleBank, sample_rate: f32) -> Self {
        let one_shot = |slot: SampleSlot, envelope: EnvelopeSettings, pre_gain: f32| {
            SampleVoice::new(
                bank.get(slot).cloned(),
                envelope,
                pre_gain,
                Playback::OneShot,
                sample_rate,
            )
        };
        Self {
            metronome: one_shot(SampleSlot::Metronome, metronome_envelope(), 1.0),
            hits: Hit::ALL.map(|hit| one_shot(hit.slot(), hit_envelope(), hit.pre_gain())),
            key_arp: one_shot(SampleSlot::KeyArp, key_loop_envelope(), 1.0),
            key_hi: one_shot(SampleSlot::KeyHi, key_loop_envelope(), 1.0),
            key_low: one_shot(SampleSlot::KeyLow, key_loop_envelope(), 1.0),
            bass: BassVoice::new(bass_envelope(), sample_rate),
            atmos: SamplePlayer::new(bank.get(SampleSlot::Atmos).cloned()),
            atmos_panner: SineOsc::new(sample_rate),
        }
    }

    pub fn hit(&self, hit: Hit) -> &SampleVoice {
        &self.hits[hit.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample_buffer::SampleBuffer;

    #[test]
    fn test_key_bindings() {
        assert_eq!(Hit::from_key('1'), Some(Hit::Hi));
        assert_eq!(Hit::from_key('4'), Some(Hit::Sub));
        assert_eq!(Hit::from_key('5'), None);
        assert_eq!(Hit::from_key('a'), None);
    }

    #[test]
    fn test_trigger_flags_are_taken_once() {
        let triggers = HitTriggers::default();
        triggers.fire(Hit::Mid);
        assert!(triggers.is_pending(Hit::Mid));
        assert!(!triggers.take(Hit::Hi));
        assert!(triggers.take(Hit::Mid));
        assert!(!triggers.take(Hit::Mid));
    }

    #[test]
    fn test_missing_samples_give_silent_voices() {
        let mut bank = SampleBank::empty();
        bank.insert(SampleSlot::HitHi, SampleBuffer::new(vec![1.0; 8], 44100));
        let instruments = Instruments::new(&bank, 44100.0);
        assert!(instruments.hit(Hit::Hi).is_loaded());
        assert!(!instruments.hit(Hit::Sub).is_loaded());
        assert!(!instruments.metronome.is_loaded());
        assert!(!instruments.atmos.is_loaded());
    }
}
