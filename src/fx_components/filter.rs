// src/fx_components/filter.rs

//! Resonant low-pass built on a trapezoidal state variable filter.
//! Coefficients are recomputed every sample with no smoothing.

use crate::fx_components::DspComponent;
use std::f32::consts::PI;

const MIN_CUTOFF_HZ: f32 = 20.0;
const MIN_Q: f32 = 0.1;
const MAX_Q: f32 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LowPassSettings {
    pub cutoff_hz: f32,
    /// Resonance. 0.707 is flat, higher values peak at the cutoff.
    pub q: f32,
}

#[derive(Debug, Clone)]
pub struct LowPassFilter {
    sample_rate: f32,
    z1: f32,
    z2: f32,
}

impl LowPassFilter {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            z1: 0.0,
            z2: 0.0,
        }
    }
}

impl DspComponent for LowPassFilter {
    type Settings = LowPassSettings;

    #[inline]
    fn process(&mut self, input: f32, settings: LowPassSettings) -> f32 {
        // --- 1. Clamp Target Values ---
        let nyquist_margin = (self.sample_rate / 2.0 - MIN_CUTOFF_HZ).max(MIN_CUTOFF_HZ);
        let cutoff_hz = if settings.cutoff_hz.is_nan() {
            nyquist_margin
        } else {
            settings.cutoff_hz.clamp(MIN_CUTOFF_HZ, nyquist_margin)
        };
        let q = if settings.q.is_nan() {
            MIN_Q
        } else {
            settings.q.clamp(MIN_Q, MAX_Q)
        };

        // --- 2. Calculate filter coefficients on the fly ---
        let g = (PI * cutoff_hz / self.sample_rate).tan();
        let k = 1.0 / q;
        let a1 = 1.0 / (1.0 + g * (g + k));
        let a2 = g * a1;
        let a3 = g * a2;

        // --- 3. Process the sample ---
        let v3 = input - self.z2;
        let v1 = a1 * self.z1 + a2 * v3;
        let v2 = self.z2 + a2 * self.z1 + a3 * v3;

        self.z1 = (2.0 * v1 - self.z1).clamp(-1e6, 1e6);
        self.z2 = (2.0 * v2 - self.z2).clamp(-1e6, 1e6);

        v2
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oscillator::SineOsc;

    const SR: f32 = 44100.0;

    fn rms_of_sine(freq: f32, settings: LowPassSettings) -> f32 {
        let mut filter = LowPassFilter::new(SR);
        let mut osc = SineOsc::new(SR);
        // Let the filter settle before measuring.
        for _ in 0..4410 {
            filter.process(osc.sinewave(freq), settings);
        }
        let n = 44100;
        let sum: f32 = (0..n)
            .map(|_| filter.process(osc.sinewave(freq), settings).powi(2))
            .sum();
        (sum / n as f32).sqrt()
    }

    #[test]
    fn test_silence_stays_silent() {
        let mut filter = LowPassFilter::new(SR);
        let settings = LowPassSettings { cutoff_hz: 4000.0, q: 4.0 };
        assert!((0..1000).all(|_| filter.process(0.0, settings) == 0.0));
    }

    #[test]
    fn test_dc_passes_at_unity() {
        let mut filter = LowPassFilter::new(SR);
        let settings = LowPassSettings { cutoff_hz: 1000.0, q: 0.5 };
        let mut out = 0.0;
        for _ in 0..44100 {
            out = filter.process(1.0, settings);
        }
        assert!((out - 1.0).abs() < 1e-3, "dc gain {}", out);
    }

    #[test]
    fn test_attenuates_above_cutoff() {
        let settings = LowPassSettings { cutoff_hz: 500.0, q: 0.707 };
        let pass = rms_of_sine(100.0, settings);
        let stop = rms_of_sine(8000.0, settings);
        assert!(pass > 0.6, "passband rms {}", pass);
        assert!(stop < 0.02, "stopband rms {}", stop);
    }

    #[test]
    fn test_out_of_range_settings_stay_finite() {
        let mut filter = LowPassFilter::new(SR);
        let wild = LowPassSettings { cutoff_hz: -50.0, q: 0.0 };
        let huge = LowPassSettings { cutoff_hz: 1e9, q: f32::NAN };
        for i in 0..10_000 {
            let input = if i % 2 == 0 { 1.0 } else { -1.0 };
            let settings = if i % 100 < 50 { wild } else { huge };
            assert!(filter.process(input, settings).is_finite());
        }
    }
}
