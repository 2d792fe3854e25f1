// src/sequencer.rs

//! Shared play-head and per-voice trigger derivation.

use crate::error::PatternError;
use crate::pattern::{PatternSet, BASS_LINE_NOTES};

/// Triggers for one frame. Everything is false on frames without a tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StepTriggers {
    pub metronome: bool,
    pub key_arp: bool,
    pub key_hi: bool,
    pub key_low: bool,
    pub bass: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveSet {
    Builtin(usize),
    Complete,
}

#[derive(Debug, Clone)]
pub struct Sequencer {
    sets: Vec<PatternSet>,
    complete: PatternSet,
    active: ActiveSet,
    // Last regular set, so a new level can move on from where the game was.
    last_builtin: usize,
    play_head: u64,
    bass_note: usize,
    bass_frequency: f32,
    metronome_speed: f32,
}

impl Sequencer {
    pub fn new(sets: Vec<PatternSet>, complete: PatternSet) -> Result<Self, PatternError> {
        if sets.is_empty() {
            return Err(PatternError::NoSets);
        }
        Ok(Self::from_parts(sets, complete))
    }

    pub fn with_builtin_sets() -> Self {
        Self::from_parts(PatternSet::builtin(), PatternSet::complete())
    }

    // `sets` must not be empty.
    fn from_parts(sets: Vec<PatternSet>, complete: PatternSet) -> Self {
        let mut sequencer = Self {
            sets,
            complete,
            active: ActiveSet::Builtin(0),
            last_builtin: 0,
            play_head: 0,
            bass_note: 0,
            bass_frequency: 0.0,
            metronome_speed: 1.0,
        };
        sequencer.reset_transport();
        sequencer
    }

    pub fn set_count(&self) -> usize {
        self.sets.len()
    }

    pub fn active(&self) -> ActiveSet {
        self.active
    }

    pub fn active_set(&self) -> &PatternSet {
        match self.active {
            ActiveSet::Builtin(index) => &self.sets[index],
            ActiveSet::Complete => &self.complete,
        }
    }

    pub fn play_head(&self) -> u64 {
        self.play_head
    }

    /// Frequency of the bass note most recently stepped to.
    pub fn bass_frequency(&self) -> f32 {
        self.bass_frequency
    }

    /// Metronome playback speed latched on the last tick.
    pub fn metronome_speed(&self) -> f32 {
        self.metronome_speed
    }

    /// Switches the active set. An index past the end is ignored and returns false.
    pub fn set_pattern(&mut self, index: usize) -> bool {
        if index >= self.sets.len() {
            return false;
        }
        self.active = ActiveSet::Builtin(index);
        self.last_builtin = index;
        true
    }

    /// Moves to the regular set after the last one played, wrapping.
    pub fn next_set(&mut self) -> usize {
        let next = match self.active {
            ActiveSet::Builtin(index) => (index + 1) % self.sets.len(),
            ActiveSet::Complete => (self.last_builtin + 1) % self.sets.len(),
        };
        self.active = ActiveSet::Builtin(next);
        self.last_builtin = next;
        next
    }

    pub fn enter_complete(&mut self) {
        self.active = ActiveSet::Complete;
    }

    /// Restarts the play-head and the bass walk in place. The active set is kept.
    pub fn reset_transport(&mut self) {
        self.play_head = 0;
        self.bass_note = 0;
        self.metronome_speed = 1.0;
        self.bass_frequency = self.active_set().bass_line.frequency(0);
    }

    /// Derives every voice's trigger at the current play-head, steps the bass walk,
    /// then advances the play-head. Call once per clock tick.
    pub fn tick(&mut self) -> StepTriggers {
        let play_head = self.play_head;
        let set = match self.active {
            ActiveSet::Builtin(index) => &self.sets[index],
            ActiveSet::Complete => &self.complete,
        };
        let triggers = StepTriggers {
            metronome: set.metronome.at(play_head),
            key_arp: set.key_arp.at(play_head),
            key_hi: set.key_hi.at(play_head),
            key_low: set.key_low.at(play_head),
            bass: set.bass.at(play_head),
        };
        self.metronome_speed = set.metronome_speed.at(play_head);
        if triggers.bass {
            self.bass_frequency = set.bass_line.frequency(self.bass_note);
            self.bass_note = (self.bass_note + 1) % BASS_LINE_NOTES;
        }
        self.play_head = self.play_head.wrapping_add(1);
        triggers
    }
}
