// src/theory.rs

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Scales the bass line can walk.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Scale {
    Ionian,
    NaturalMinor,
    Dorian,
    Phrygian,
    MinorPentatonic,
    Chromatic,
}

impl Scale {
    /// Semitones from the root for each degree of one octave.
    pub fn intervals(&self) -> &'static [u8] {
        match self {
            Scale::Ionian => &[0, 2, 4, 5, 7, 9, 11],
            Scale::NaturalMinor => &[0, 2, 3, 5, 7, 8, 10],
            Scale::Dorian => &[0, 2, 3, 5, 7, 9, 10],
            Scale::Phrygian => &[0, 1, 3, 5, 7, 8, 10],
            Scale::MinorPentatonic => &[0, 3, 5, 7, 10],
            Scale::Chromatic => &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11],
        }
    }

    /// MIDI note for a scale degree relative to `root`. Degrees past the end of the
    /// scale continue into the next octave, negative degrees into the one below.
    /// The result is clamped to the MIDI range.
    pub fn degree_to_midi(&self, root: u8, degree: i32) -> u8 {
        let intervals = self.intervals();
        let len = intervals.len() as i32;
        let octave = degree.div_euclid(len);
        let step = degree.rem_euclid(len) as usize;
        let note = root as i32 + octave * 12 + intervals[step] as i32;
        note.clamp(0, 127) as u8
    }
}

impl std::fmt::Display for Scale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Scale::Ionian => "Major (Ionian)",
            Scale::NaturalMinor => "Minor (Aeolian)",
            Scale::Dorian => "Dorian",
            Scale::Phrygian => "Phrygian",
            Scale::MinorPentatonic => "Minor Pentatonic",
            Scale::Chromatic => "Chromatic",
        };
        write!(f, "{}", name)
    }
}

// Equal temperament, A4 (note 69) = 440 Hz.
static MTOF_TABLE: Lazy<[f32; 128]> = Lazy::new(|| {
    let mut table = [0.0; 128];
    for (note, freq) in table.iter_mut().enumerate() {
        *freq = 440.0 * 2.0_f32.powf((note as f32 - 69.0) / 12.0);
    }
    table
});

/// Frequency in Hz of a MIDI note number.
#[inline]
pub fn mtof(note: u8) -> f32 {
    MTOF_TABLE[(note & 0x7f) as usize]
}
