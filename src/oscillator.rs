// src/oscillator.rs

use std::f64::consts::TAU;

/// Phase-accumulating sine. The frequency is passed per sample so callers can
/// drive it from live parameters.
#[derive(Debug, Clone)]
pub struct SineOsc {
    phase: f64,
    sample_rate: f64,
}

impl SineOsc {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            phase: 0.0,
            sample_rate: sample_rate.max(1.0) as f64,
        }
    }

    /// Returns the current value, then advances by `freq_hz`.
    #[inline]
    pub fn sinewave(&mut self, freq_hz: f32) -> f32 {
        let out = (self.phase * TAU).sin() as f32;
        self.phase = (self.phase + freq_hz as f64 / self.sample_rate).rem_euclid(1.0);
        out
    }

    /// Same as `sinewave`, mapped from -1..1 to 0..1 for use as a pan position.
    #[inline]
    pub fn unipolar(&mut self, freq_hz: f32) -> f32 {
        (self.sinewave(freq_hz) + 1.0) * 0.5
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quarter_period_peaks() {
        let mut osc = SineOsc::new(400.0);
        let out: Vec<f32> = (0..5).map(|_| osc.sinewave(100.0)).collect();
        assert!(out[0].abs() < 1e-6);
        assert!((out[1] - 1.0).abs() < 1e-6);
        assert!(out[2].abs() < 1e-6);
        assert!((out[3] + 1.0).abs() < 1e-6);
        assert!(out[4].abs() < 1e-6);
    }

    #[test]
    fn test_unipolar_range() {
        let mut osc = SineOsc::new(44100.0);
        for _ in 0..44100 {
            let v = osc.unipolar(3.0);
            assert!((0.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn test_zero_frequency_holds() {
        let mut osc = SineOsc::new(44100.0);
        assert!(osc.sinewave(0.0).abs() < 1e-9);
        assert!(osc.sinewave(0.0).abs() < 1e-9);
    }
}
