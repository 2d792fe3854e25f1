// src/fx_chain.rs

//! The stereo effects chain: low-pass filter, then feedback delay and the
//! multi-tap reverb, both fed from the filter output and each blended with it.

use crate::fx_components::{
    reverb, DelayLine, DelaySettings, DspComponent, LowPassFilter, LowPassSettings, ReverbBank,
};
use crate::params::FrameParams;
use tracing::debug;

/// Longest delay time the chain allocates for, in seconds.
pub const MAX_DELAY_SECONDS: f32 = 2.0;

/// Everything the chain reads live for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FxSettings {
    pub cutoff_hz: f32,
    pub q: f32,
    pub delay_seconds: f32,
    pub delay_feedback: f32,
    /// 1.0 is fully dry.
    pub delay_dry_mix: f32,
    pub reverb_feedback: f32,
    pub reverb_dry_mix: f32,
}

impl From<&FrameParams> for FxSettings {
    fn from(p: &FrameParams) -> Self {
        Self {
            cutoff_hz: p.low_res_freq,
            q: p.low_res_q,
            delay_seconds: p.delay_time,
            delay_feedback: p.delay_feedback,
            delay_dry_mix: p.delay_dry_mix,
            reverb_feedback: p.reverb_feedback,
            reverb_dry_mix: p.reverb_dry_mix,
        }
    }
}

#[derive(Debug, Clone)]
struct Channel {
    filter: LowPassFilter,
    delay: DelayLine,
    reverb: ReverbBank,
}

impl Channel {
    #[inline]
    fn process(&mut self, input: f32, settings: &FxSettings, sample_rate: f32) -> f32 {
        let filtered = self.filter.process(
            input,
            LowPassSettings {
                cutoff_hz: settings.cutoff_hz,
                q: settings.q,
            },
        );

        let delayed = self.delay.process(
            filtered,
            DelaySettings::from_seconds(settings.delay_seconds, sample_rate, settings.delay_feedback),
        );
        let delay_out = wet_dry(delayed, filtered, settings.delay_dry_mix);

        let reverberated = self.reverb.process(filtered, settings.reverb_feedback);
        let reverb_out = wet_dry(reverberated, filtered, settings.reverb_dry_mix);

        delay_out + reverb_out
    }
}

#[inline(always)]
fn wet_dry(wet: f32, dry: f32, dry_mix: f32) -> f32 {
    let dry_mix = if dry_mix.is_nan() {
        1.0
    } else {
        dry_mix.clamp(0.0, 1.0)
    };
    wet * (1.0 - dry_mix) + dry * dry_mix
}

#[derive(Debug, Clone)]
pub struct FxChain {
    channels: [Channel; 2],
    sample_rate: f32,
    tap_seconds: Vec<f32>,
}

impl FxChain {
    /// Both channels share the same reverb tap times.
    pub fn new(sample_rate: f32, tap_seconds: Vec<f32>) -> Self {
        debug!(taps = ?tap_seconds, "Reverb tap times");
        let channel = || Channel {
            filter: LowPassFilter::new(sample_rate),
            delay: DelayLine::new(MAX_DELAY_SECONDS, sample_rate),
            reverb: ReverbBank::new(sample_rate, &tap_seconds),
        };
        Self {
            channels: [channel(), channel()],
            sample_rate,
            tap_seconds,
        }
    }

    /// Draws fresh tap times, reproducibly when `seed` is given.
    pub fn with_random_taps(sample_rate: f32, seed: Option<u64>) -> Self {
        Self::new(
            sample_rate,
            reverb::random_tap_times(reverb::DEFAULT_TAP_COUNT, seed),
        )
    }

    pub fn tap_seconds(&self) -> &[f32] {
        &self.tap_seconds
    }

    /// Processes one stereo frame. Returns the delay stage output plus the reverb
    /// stage output per channel.
    #[inline]
    pub fn process(&mut self, input: [f32; 2], settings: &FxSettings) -> [f32; 2] {
        let sample_rate = self.sample_rate;
        let [left, right] = &mut self.channels;
        [
            left.process(input[0], settings, sample_rate),
            right.process(input[1], settings, sample_rate),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f32 = 44100.0;

    fn settings() -> FxSettings {
        FxSettings {
            cutoff_hz: 20000.0,
            q: 0.5,
            delay_seconds: 0.1,
            delay_feedback: 0.0,
            delay_dry_mix: 1.0,
            reverb_feedback: 0.0,
            reverb_dry_mix: 1.0,
        }
    }

    #[test]
    fn test_silence_in_silence_out() {
        let mut chain = FxChain::with_random_taps(SR, Some(3));
        let settings = FxSettings {
            delay_dry_mix: 0.3,
            reverb_dry_mix: 0.3,
            delay_feedback: 0.9,
            reverb_feedback: 0.99,
            ..settings()
        };
        for _ in 0..10_000 {
            assert_eq!(chain.process([0.0, 0.0], &settings), [0.0, 0.0]);
        }
    }

    #[test]
    fn test_fully_dry_output_is_doubled_filter_output() {
        let mut chain = FxChain::with_random_taps(SR, Some(3));
        let mut reference = LowPassFilter::new(SR);
        let s = settings();
        for i in 0..2000 {
            let x = if i % 50 == 0 { 0.5 } else { 0.0 };
            let expected = reference.process(
                x,
                LowPassSettings {
                    cutoff_hz: s.cutoff_hz,
                    q: s.q,
                },
            );
            let [l, r] = chain.process([x, 0.0], &s);
            assert!((l - 2.0 * expected).abs() < 1e-6);
            assert_eq!(r, 0.0);
        }
    }

    #[test]
    fn test_fully_wet_delay_echoes_once() {
        let mut chain = FxChain::new(SR, vec![0.03]);
        let s = FxSettings {
            delay_dry_mix: 0.0,
            reverb_dry_mix: 1.0,
            ..settings()
        };
        let out: Vec<f32> = (0..SR as usize / 2)
            .map(|i| chain.process([if i == 0 { 1.0 } else { 0.0 }; 2], &s)[0])
            .collect();
        // Dry path carries the filtered impulse, the echo starts 100 ms later.
        let echo_start = (0.1 * SR) as usize;
        let early_energy: f32 = out[..echo_start].iter().map(|v| v * v).sum();
        let echo_energy: f32 = out[echo_start..].iter().map(|v| v * v).sum();
        assert!(early_energy > 0.0);
        assert!((early_energy - echo_energy).abs() < 1e-3 * early_energy.max(1e-9) + 1e-6);
    }

    #[test]
    fn test_tap_times_shared_between_channels() {
        let chain = FxChain::with_random_taps(SR, Some(11));
        assert_eq!(chain.tap_seconds().len(), reverb::DEFAULT_TAP_COUNT);
        let left: Vec<usize> = chain.channels[0].reverb.tap_delays().collect();
        let right: Vec<usize> = chain.channels[1].reverb.tap_delays().collect();
        assert_eq!(left, right);
    }
}
