// src/fx_components/delay.rs

//! Circular-buffer feedback delay.
use crate::fx_components::DspComponent;

/// Largest feedback applied, whatever the caller asks for.
pub const MAX_FEEDBACK: f32 = 0.999;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DelaySettings {
    pub delay_samples: usize,
    pub feedback: f32,
}

impl DelaySettings {
    pub fn from_seconds(seconds: f32, sample_rate: f32, feedback: f32) -> Self {
        let delay_samples = if seconds.is_finite() {
            (seconds.max(0.0) * sample_rate).round() as usize
        } else {
            0
        };
        Self {
            delay_samples,
            feedback,
        }
    }
}

/// Reads the sample written `delay_samples` ago, then writes the input plus the
/// fed-back output. Indices always wrap at the buffer capacity.
#[derive(Debug, Clone)]
pub struct DelayLine {
    buffer: Vec<f32>,
    write_pos: usize,
}

impl DelayLine {
    /// Allocates enough room for `max_delay_seconds` at `sample_rate`.
    pub fn new(max_delay_seconds: f32, sample_rate: f32) -> Self {
        let max_delay_samples = (max_delay_seconds.max(0.0) * sample_rate).ceil() as usize;
        Self::with_capacity(max_delay_samples + 2)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: vec![0.0; capacity.max(2)],
            write_pos: 0,
        }
    }

    /// Longest delay this line can produce.
    pub fn max_delay_samples(&self) -> usize {
        self.buffer.len() - 1
    }
}

impl DspComponent for DelayLine {
    type Settings = DelaySettings;

    #[inline]
    fn process(&mut self, input: f32, settings: DelaySettings) -> f32 {
        // --- 1. Clamp Target Values ---
        let capacity = self.buffer.len();
        let delay = settings.delay_samples.clamp(1, capacity - 1);
        let feedback = if settings.feedback.is_nan() {
            0.0
        } else {
            settings.feedback.clamp(0.0, MAX_FEEDBACK)
        };

        // --- 2. Process Audio ---
        let read_pos = (self.write_pos + capacity - delay) % capacity;
        let output = self.buffer[read_pos];
        self.buffer[self.write_pos] = input + output * feedback;
        self.write_pos = (self.write_pos + 1) % capacity;
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn impulse_response(line: &mut DelayLine, settings: DelaySettings, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| line.process(if i == 0 { 1.0 } else { 0.0 }, settings))
            .collect()
    }

    #[test]
    fn test_zero_feedback_gives_one_echo() {
        let mut line = DelayLine::new(2.0, 44100.0);
        let settings = DelaySettings::from_seconds(0.25, 44100.0, 0.0);
        assert_eq!(settings.delay_samples, 11025);
        let out = impulse_response(&mut line, settings, 44100 * 2);
        let echoes: Vec<usize> = out
            .iter()
            .enumerate()
            .filter(|(_, &v)| v != 0.0)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(echoes, vec![11025]);
        assert_eq!(out[11025], 1.0);
    }

    #[test]
    fn test_feedback_repeats_decay() {
        let mut line = DelayLine::with_capacity(16);
        let settings = DelaySettings {
            delay_samples: 4,
            feedback: 0.5,
        };
        let out = impulse_response(&mut line, settings, 13);
        assert_eq!(out[4], 1.0);
        assert_eq!(out[8], 0.5);
        assert_eq!(out[12], 0.25);
        assert_eq!(out.iter().filter(|&&v| v != 0.0).count(), 3);
    }

    #[test]
    fn test_feedback_is_clamped_below_one() {
        let mut line = DelayLine::with_capacity(4);
        let settings = DelaySettings {
            delay_samples: 2,
            feedback: 5.0,
        };
        let out = impulse_response(&mut line, settings, 4000);
        assert!(out.iter().all(|v| v.abs() <= 1.0));
    }

    #[test]
    fn test_delay_is_clamped_to_capacity() {
        let mut line = DelayLine::with_capacity(8);
        let too_long = DelaySettings {
            delay_samples: 100,
            feedback: 0.0,
        };
        let out = impulse_response(&mut line, too_long, 10);
        assert_eq!(out[7], 1.0);

        let mut line = DelayLine::with_capacity(8);
        let zero = DelaySettings {
            delay_samples: 0,
            feedback: 0.0,
        };
        let out = impulse_response(&mut line, zero, 3);
        assert_eq!(out, vec![0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_negative_time_is_zero() {
        assert_eq!(DelaySettings::from_seconds(-1.0, 44100.0, 0.0).delay_samples, 0);
        assert_eq!(DelaySettings::from_seconds(f32::NAN, 44100.0, 0.0).delay_samples, 0);
    }
}
