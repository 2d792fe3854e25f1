// src/clock.rs

//! Sample-driven tick generator for the step sequencer.

pub const DEFAULT_TEMPO_BPM: f64 = 100.0;
pub const DEFAULT_TICKS_PER_BEAT: u32 = 4;

#[derive(Debug, Clone)]
pub struct Clock {
    bpm: f64,
    ticks_per_beat: u32,
    sample_rate: f64,
    // Fraction of a tick accumulated so far. At 1.0 the next sample ticks.
    phase: f64,
    increment: f64,
}

impl Clock {
    pub fn new(sample_rate: f32) -> Self {
        let mut clock = Self {
            bpm: DEFAULT_TEMPO_BPM,
            ticks_per_beat: DEFAULT_TICKS_PER_BEAT,
            sample_rate: sample_rate.max(1.0) as f64,
            phase: 1.0,
            increment: 0.0,
        };
        clock.update_increment();
        clock
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    pub fn ticks_per_beat(&self) -> u32 {
        self.ticks_per_beat
    }

    /// Ticks per second.
    pub fn tick_frequency(&self) -> f64 {
        self.bpm * self.ticks_per_beat as f64 / 60.0
    }

    /// Ignores non-positive or non-finite tempos and returns whether the value was taken.
    pub fn set_tempo(&mut self, bpm: f64) -> bool {
        if !bpm.is_finite() || bpm <= 0.0 {
            return false;
        }
        self.bpm = bpm;
        self.update_increment();
        true
    }

    pub fn set_ticks_per_beat(&mut self, ticks_per_beat: u32) -> bool {
        if ticks_per_beat == 0 {
            return false;
        }
        self.ticks_per_beat = ticks_per_beat;
        self.update_increment();
        true
    }

    /// The next processed sample will tick.
    pub fn reset(&mut self) {
        self.phase = 1.0;
    }

    /// Advances by one sample. Returns true on the sample a tick falls on.
    #[inline]
    pub fn ticker(&mut self) -> bool {
        let tick = self.phase >= 1.0;
        if tick {
            self.phase -= self.phase.floor();
        }
        self.phase += self.increment;
        tick
    }

    fn update_increment(&mut self) {
        self.increment = self.tick_frequency() / self.sample_rate;
    }
}
