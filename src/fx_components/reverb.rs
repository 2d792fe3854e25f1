// src/fx_components/reverb.rs

//! Multi-tap feedback reverb: a bank of parallel feedback delays, each with its
//! own randomly chosen length, averaged together.

use crate::fx_components::delay::{DelayLine, DelaySettings};
use crate::fx_components::DspComponent;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const DEFAULT_TAP_COUNT: usize = 10;
pub const MIN_TAP_SECONDS: f32 = 0.02;
pub const MAX_TAP_SECONDS: f32 = 0.05;

/// Draws `count` tap times uniformly from the tap range. The same seed always
/// gives the same times; without one the times come from system entropy.
pub fn random_tap_times(count: usize, seed: Option<u64>) -> Vec<f32> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    (0..count)
        .map(|_| rng.gen_range(MIN_TAP_SECONDS..MAX_TAP_SECONDS))
        .collect()
}

#[derive(Debug, Clone)]
struct Tap {
    line: DelayLine,
    delay_samples: usize,
}

#[derive(Debug, Clone)]
pub struct ReverbBank {
    taps: Vec<Tap>,
    // 1 / tap count
    scale: f32,
}

impl ReverbBank {
    /// One tap per entry of `tap_seconds`. Tap lengths are fixed for the life of the bank.
    pub fn new(sample_rate: f32, tap_seconds: &[f32]) -> Self {
        let taps: Vec<Tap> = tap_seconds
            .iter()
            .map(|&seconds| {
                let line = DelayLine::new(seconds, sample_rate);
                let delay_samples = DelaySettings::from_seconds(seconds, sample_rate, 0.0)
                    .delay_samples
                    .clamp(1, line.max_delay_samples());
                Tap { line, delay_samples }
            })
            .collect();
        let scale = if taps.is_empty() {
            0.0
        } else {
            1.0 / taps.len() as f32
        };
        Self { taps, scale }
    }

    pub fn tap_delays(&self) -> impl Iterator<Item = usize> + '_ {
        self.taps.iter().map(|t| t.delay_samples)
    }
}

impl DspComponent for ReverbBank {
    /// Feedback shared by every tap.
    type Settings = f32;

    #[inline]
    fn process(&mut self, input: f32, feedback: f32) -> f32 {
        let sum: f32 = self
            .taps
            .iter_mut()
            .map(|tap| {
                tap.line.process(
                    input,
                    DelaySettings {
                        delay_samples: tap.delay_samples,
                        feedback,
                    },
                )
            })
            .sum();
        sum * self.scale
    }
}
