// src/pattern.rs

//! Step patterns and the built-in pattern sets the sequencer switches between.

use crate::error::PatternError;
use crate::theory::{mtof, Scale};

pub const METRONOME_STEPS: usize = 16;
pub const KEY_ARP_STEPS: usize = 32;
pub const KEY_HI_STEPS: usize = 64;
pub const KEY_LOW_STEPS: usize = 128;
pub const BASS_STEPS: usize = 16;
/// Notes in the bass line's melodic walk.
pub const BASS_LINE_NOTES: usize = 6;

/// A power-of-two length step sequence, read at `play_head mod len`.
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern<T> {
    steps: Vec<T>,
    mask: usize,
}

impl<T: Copy> Pattern<T> {
    pub fn new(steps: Vec<T>) -> Result<Self, PatternError> {
        if steps.is_empty() {
            return Err(PatternError::Empty);
        }
        if !steps.len().is_power_of_two() {
            return Err(PatternError::NotPowerOfTwo { len: steps.len() });
        }
        let mask = steps.len() - 1;
        Ok(Self { steps, mask })
    }

    /// Builds from a fixed-size array, checking the length at compile time.
    pub fn from_array<const N: usize>(steps: [T; N]) -> Self {
        const { assert!(N.is_power_of_two()) };
        Self {
            steps: steps.to_vec(),
            mask: N - 1,
        }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    #[inline]
    pub fn at(&self, play_head: u64) -> T {
        self.steps[(play_head & self.mask as u64) as usize]
    }
}

impl Pattern<bool> {
    /// An N-step gate pattern that fires on the listed steps.
    pub fn pulses<const N: usize>(on_steps: &[usize]) -> Self {
        let mut steps = [false; N];
        for &step in on_steps {
            steps[step % N] = true;
        }
        Self::from_array(steps)
    }
}

/// The bass line's melodic walk, stored as precomputed frequencies.
#[derive(Debug, Clone, PartialEq)]
pub struct BassLine {
    pub root: u8,
    pub scale: Scale,
    pub degrees: [i32; BASS_LINE_NOTES],
    frequencies: [f32; BASS_LINE_NOTES],
}

impl BassLine {
    pub fn new(root: u8, scale: Scale, degrees: [i32; BASS_LINE_NOTES]) -> Self {
        let frequencies = degrees.map(|d| mtof(scale.degree_to_midi(root, d)));
        Self {
            root,
            scale,
            degrees,
            frequencies,
        }
    }

    #[inline]
    pub fn frequency(&self, note: usize) -> f32 {
        self.frequencies[note % BASS_LINE_NOTES]
    }
}

/// Every voice's pattern for one musical section.
#[derive(Debug, Clone)]
pub struct PatternSet {
    pub name: &'static str,
    pub metronome: Pattern<bool>,
    /// Playback speed of the metronome sample, latched on each tick.
    pub metronome_speed: Pattern<f32>,
    pub key_arp: Pattern<bool>,
    pub key_hi: Pattern<bool>,
    pub key_low: Pattern<bool>,
    pub bass: Pattern<bool>,
    pub bass_line: BassLine,
}

impl PatternSet {
    /// The default section. The key loops are two-bar samples, so each restarts
    /// once per its own pattern length at four ticks per beat.
    pub fn drift() -> Self {
        Self {
            name: "drift",
            metronome: Pattern::pulses::<METRONOME_STEPS>(&[0, 4, 8, 12]),
            metronome_speed: Pattern::from_array([
                1.0, 1.0, 1.0, 1.0, 1.5, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 0.75, 1.0, 1.0, 1.0,
            ]),
            key_arp: Pattern::pulses::<KEY_ARP_STEPS>(&[0]),
            key_hi: Pattern::pulses::<KEY_HI_STEPS>(&[0, 32]),
            key_low: Pattern::pulses::<KEY_LOW_STEPS>(&[0, 64]),
            bass: Pattern::pulses::<BASS_STEPS>(&[0, 3, 6, 10, 13]),
            bass_line: BassLine::new(36, Scale::NaturalMinor, [0, 2, 4, 3, 2, -1]),
        }
    }

    pub fn pulse() -> Self {
        Self {
            name: "pulse",
            metronome: Pattern::pulses::<METRONOME_STEPS>(&[0, 2, 4, 6, 8, 10, 12, 14]),
            metronome_speed: Pattern::from_array([
                1.0, 0.8, 1.0, 0.8, 1.2, 0.8, 1.0, 0.8, 1.0, 0.8, 1.0, 0.8, 1.5, 0.8, 1.0, 0.8,
            ]),
            key_arp: Pattern::pulses::<KEY_ARP_STEPS>(&[0, 16]),
            key_hi: Pattern::pulses::<KEY_HI_STEPS>(&[8, 40]),
            key_low: Pattern::pulses::<KEY_LOW_STEPS>(&[0]),
            bass: Pattern::pulses::<BASS_STEPS>(&[0, 2, 4, 7, 8, 11, 14]),
            bass_line: BassLine::new(38, Scale::Dorian, [0, 4, 2, 5, 4, 1]),
        }
    }

    pub fn sparse() -> Self {
        Self {
            name: "sparse",
            metronome: Pattern::pulses::<METRONOME_STEPS>(&[0, 8]),
            metronome_speed: Pattern::from_array([0.5; METRONOME_STEPS]),
            key_arp: Pattern::pulses::<KEY_ARP_STEPS>(&[0]),
            key_hi: Pattern::pulses::<KEY_HI_STEPS>(&[16]),
            key_low: Pattern::pulses::<KEY_LOW_STEPS>(&[0, 96]),
            bass: Pattern::pulses::<BASS_STEPS>(&[0, 8]),
            bass_line: BassLine::new(33, Scale::Phrygian, [0, 1, 0, -2, 0, 3]),
        }
    }

    /// Played after a level is completed, until the next level starts.
    pub fn complete() -> Self {
        Self {
            name: "complete",
            metronome: Pattern::pulses::<METRONOME_STEPS>(&[]),
            metronome_speed: Pattern::from_array([1.0; METRONOME_STEPS]),
            key_arp: Pattern::pulses::<KEY_ARP_STEPS>(&[]),
            key_hi: Pattern::pulses::<KEY_HI_STEPS>(&[0]),
            key_low: Pattern::pulses::<KEY_LOW_STEPS>(&[0]),
            bass: Pattern::pulses::<BASS_STEPS>(&[0]),
            bass_line: BassLine::new(36, Scale::Ionian, [0, 4, 7, 4, 2, 0]),
        }
    }

    /// The sets `set_pattern` indexes into.
    pub fn builtin() -> Vec<PatternSet> {
        vec![Self::drift(), Self::pulse(), Self::sparse()]
    }
}
