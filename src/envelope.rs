// src/envelope.rs

//! Trigger-driven amplitude envelopes (attack/release and full ADSR).
//!
//! Times are in milliseconds at the engine sample rate. A trigger restarts the
//! attack from the current level, so retriggering never jumps.

use serde::{Deserialize, Serialize};

/// Level below which an exponential release is considered finished (-80 dB).
const EXP_FLOOR: f32 = 1e-4;
/// Fraction of the remaining distance an exponential attack/decay leaves at its nominal time.
const EXP_TARGET_RATIO: f32 = 1e-3;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RampShape {
    Linear,
    Exponential,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeSettings {
    pub attack_ms: f32,
    pub decay_ms: f32,
    /// Sustain level, clamped to 0.0..=1.0.
    pub sustain: f32,
    /// How long Sustain holds after the trigger before releasing (at least one sample).
    pub hold_ms: f32,
    pub release_ms: f32,
    pub shape: RampShape,
}

impl Default for EnvelopeSettings {
    fn default() -> Self {
        Self::adsr(10.0, 100.0, 0.8, 200.0)
    }
}

impl EnvelopeSettings {
    pub fn adsr(attack_ms: f32, decay_ms: f32, sustain: f32, release_ms: f32) -> Self {
        Self {
            attack_ms,
            decay_ms,
            sustain,
            hold_ms: 0.0,
            release_ms,
            shape: RampShape::Linear,
        }
    }

    /// Attack straight to full level, hold, then release.
    pub fn ar(attack_ms: f32, hold_ms: f32, release_ms: f32) -> Self {
        Self {
            attack_ms,
            decay_ms: 0.0,
            sustain: 1.0,
            hold_ms,
            release_ms,
            shape: RampShape::Linear,
        }
    }

    pub fn with_shape(mut self, shape: RampShape) -> Self {
        self.shape = shape;
        self
    }

    fn sanitized(self) -> Self {
        let non_negative = |v: f32| if v.is_finite() { v.max(0.0) } else { 0.0 };
        Self {
            attack_ms: non_negative(self.attack_ms),
            decay_ms: non_negative(self.decay_ms),
            sustain: if self.sustain.is_nan() {
                1.0
            } else {
                self.sustain.clamp(0.0, 1.0)
            },
            hold_ms: non_negative(self.hold_ms),
            release_ms: non_negative(self.release_ms),
            shape: self.shape,
        }
    }
}

#[derive(PartialEq, Clone, Copy, Debug)]
pub enum EnvelopeStage {
    Idle,
    Attack,
    Decay,
    Sustain,
    Release,
}

#[derive(Clone, Copy, Debug)]
pub struct Envelope {
    settings: EnvelopeSettings,
    stage: EnvelopeStage,
    level: f32,
    sample_rate: f32,
    // Per-sample coefficients derived from the settings.
    attack_rate: f32,
    decay_rate: f32,
    hold_samples: u32,
    release_coeff: f32,
    // Fixed when Release is entered so a linear release takes exactly `release_ms`.
    release_step: f32,
    hold_counter: u32,
}

impl Envelope {
    pub fn new(settings: EnvelopeSettings, sample_rate: f32) -> Self {
        let mut env = Self {
            settings,
            stage: EnvelopeStage::Idle,
            level: 0.0,
            sample_rate,
            attack_rate: 1.0,
            decay_rate: 1.0,
            hold_samples: 1,
            release_coeff: 0.0,
            release_step: 0.0,
            hold_counter: 0,
        };
        env.set_settings(settings);
        env
    }

    pub fn set_settings(&mut self, settings: EnvelopeSettings) {
        let settings = settings.sanitized();
        self.settings = settings;

        let attack_samples = self.ms_to_samples(settings.attack_ms);
        let decay_samples = self.ms_to_samples(settings.decay_ms);
        let release_samples = self.ms_to_samples(settings.release_ms);
        self.hold_samples = (self.ms_to_samples(settings.hold_ms).round() as u32).max(1);

        match settings.shape {
            RampShape::Linear => {
                self.attack_rate = if attack_samples > 0.0 {
                    (1.0 / attack_samples).min(1.0)
                } else {
                    1.0
                };
                self.decay_rate = if decay_samples > 0.0 {
                    (1.0 - settings.sustain) / decay_samples
                } else {
                    1.0
                };
                self.release_coeff = if release_samples > 0.0 {
                    1.0 / release_samples
                } else {
                    1.0
                };
            }
            RampShape::Exponential => {
                self.attack_rate = if attack_samples > 0.0 {
                    1.0 - EXP_TARGET_RATIO.powf(1.0 / attack_samples)
                } else {
                    1.0
                };
                self.decay_rate = if decay_samples > 0.0 {
                    1.0 - EXP_TARGET_RATIO.powf(1.0 / decay_samples)
                } else {
                    1.0
                };
                self.release_coeff = if release_samples > 0.0 {
                    EXP_FLOOR.powf(1.0 / release_samples)
                } else {
                    0.0
                };
            }
        }
    }

    pub fn settings(&self) -> EnvelopeSettings {
        self.settings
    }

    pub fn stage(&self) -> EnvelopeStage {
        self.stage
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    /// Largest level change the attack ramp can produce in one sample.
    pub fn max_attack_delta(&self) -> f32 {
        self.attack_rate
    }

    /// Applies the envelope to one input sample. `trigger` restarts the attack
    /// from whatever level the envelope is at.
    #[inline]
    pub fn process(&mut self, input: f32, trigger: bool) -> f32 {
        if trigger {
            self.stage = EnvelopeStage::Attack;
            self.hold_counter = 0;
        }
        input * self.next_level()
    }

    fn ms_to_samples(&self, ms: f32) -> f32 {
        ms * 0.001 * self.sample_rate
    }

    fn next_level(&mut self) -> f32 {
        let shape = self.settings.shape;
        let sustain = self.settings.sustain;
        match self.stage {
            EnvelopeStage::Idle => {
                self.level = 0.0;
            }
            EnvelopeStage::Attack => {
                match shape {
                    RampShape::Linear => self.level += self.attack_rate,
                    RampShape::Exponential => self.level += (1.0 - self.level) * self.attack_rate,
                }
                let peak = match shape {
                    RampShape::Linear => 1.0,
                    RampShape::Exponential => 1.0 - EXP_TARGET_RATIO,
                };
                if self.level >= peak {
                    self.level = 1.0;
                    self.stage = EnvelopeStage::Decay;
                }
            }
            EnvelopeStage::Decay => {
                match shape {
                    RampShape::Linear => self.level -= self.decay_rate,
                    RampShape::Exponential => {
                        self.level = sustain + (self.level - sustain) * (1.0 - self.decay_rate)
                    }
                }
                let settled = match shape {
                    RampShape::Linear => self.level <= sustain,
                    RampShape::Exponential => self.level - sustain <= EXP_TARGET_RATIO,
                };
                if settled {
                    self.level = sustain;
                    self.stage = EnvelopeStage::Sustain;
                    self.hold_counter = 0;
                }
            }
            EnvelopeStage::Sustain => {
                self.level = sustain;
                self.hold_counter += 1;
                if self.hold_counter >= self.hold_samples {
                    self.enter_release();
                }
            }
            EnvelopeStage::Release => {
                match shape {
                    RampShape::Linear => self.level -= self.release_step,
                    RampShape::Exponential => self.level *= self.release_coeff,
                }
                let floor = match shape {
                    RampShape::Linear => 0.0,
                    RampShape::Exponential => EXP_FLOOR,
                };
                if self.level <= floor {
                    self.level = 0.0;
                    self.stage = EnvelopeStage::Idle;
                }
            }
        }
        self.level
    }

    fn enter_release(&mut self) {
        self.stage = EnvelopeStage::Release;
        // Linear release covers the distance from the current level in `release_ms`.
        self.release_step = self.level * self.release_coeff;
        if self.release_step <= 0.0 {
            self.release_step = 1.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f32 = 44100.0;

    /// The percussive hit setting: near-instant attack, long release.
    fn hit_settings() -> EnvelopeSettings {
        EnvelopeSettings::adsr(0.2, 5.0, 5.0, 15000.0)
    }

    fn run(env: &mut Envelope, samples: usize, trigger_first: bool) -> Vec<f32> {
        (0..samples)
            .map(|i| env.process(1.0, trigger_first && i == 0))
            .collect()
    }

    #[test]
    fn test_idle_is_silent() {
        let mut env = Envelope::new(hit_settings(), SR);
        assert!(run(&mut env, 100, false).iter().all(|&v| v == 0.0));
        assert_eq!(env.stage(), EnvelopeStage::Idle);
    }

    #[test]
    fn test_sustain_is_clamped_to_unity() {
        let env = Envelope::new(hit_settings(), SR);
        assert_eq!(env.settings().sustain, 1.0);
    }

    #[test]
    fn test_negative_times_are_clamped() {
        let env = Envelope::new(EnvelopeSettings::adsr(-5.0, -1.0, 0.5, -3.0), SR);
        let s = env.settings();
        assert_eq!((s.attack_ms, s.decay_ms, s.release_ms), (0.0, 0.0, 0.0));
    }

    #[test]
    fn test_attack_reaches_full_level_quickly() {
        let mut env = Envelope::new(hit_settings(), SR);
        let out = run(&mut env, 20, true);
        // 0.2 ms at 44.1 kHz is under 9 samples.
        assert!(out[9] >= 0.999, "level after attack {}", out[9]);
        assert!(out.iter().all(|&v| v <= 1.0));
    }

    #[test]
    fn test_one_shot_trigger_releases_slowly() {
        let mut env = Envelope::new(hit_settings(), SR);
        let out = run(&mut env, 44100, true);
        assert_eq!(env.stage(), EnvelopeStage::Release);
        // After one second of a 15 s linear release the level has only dropped slightly.
        let last = *out.last().unwrap();
        assert!(last > 0.9 && last < 1.0, "level {}", last);
    }

    #[test]
    fn test_full_cycle_returns_to_idle() {
        let settings = EnvelopeSettings::adsr(1.0, 1.0, 0.5, 2.0);
        let mut env = Envelope::new(settings, SR);
        env.process(1.0, true);
        assert_eq!(env.stage(), EnvelopeStage::Attack);
        let out = run(&mut env, 1000, false);
        assert_eq!(env.stage(), EnvelopeStage::Idle);
        assert!(out.iter().any(|&v| (v - 0.5).abs() < 1e-6));
        assert_eq!(*out.last().unwrap(), 0.0);
    }

    #[test]
    fn test_retrigger_mid_release_is_continuous() {
        // 50 ms release, so 25 ms in the level is about halfway down.
        let mut env = Envelope::new(EnvelopeSettings::adsr(0.2, 5.0, 5.0, 50.0), SR);
        run(&mut env, 1103, true);
        assert_eq!(env.stage(), EnvelopeStage::Release);
        assert!(env.level() > 0.4 && env.level() < 0.6, "level {}", env.level());

        let max_delta = env.max_attack_delta();
        let mut previous = env.level();
        for i in 0..200 {
            let v = env.process(1.0, i == 0);
            if i == 0 {
                assert_eq!(env.stage(), EnvelopeStage::Attack);
            }
            assert!(
                (v - previous).abs() <= max_delta + 1e-6,
                "jump of {} at sample {}",
                (v - previous).abs(),
                i
            );
            previous = v;
        }
    }

    #[test]
    fn test_exponential_release_decays_to_idle() {
        let settings = EnvelopeSettings::ar(0.45, 113.0, 10.0).with_shape(RampShape::Exponential);
        let mut env = Envelope::new(settings, SR);
        let out = run(&mut env, 44100 / 2, true);
        assert!(out.iter().any(|&v| v == 1.0));
        assert_eq!(env.stage(), EnvelopeStage::Idle);
        assert_eq!(*out.last().unwrap(), 0.0);

        // Once the peak is reached the level only falls.
        let peak = out.iter().position(|&v| v == 1.0).unwrap();
        for pair in out[peak..].windows(2) {
            assert!(pair[1] <= pair[0]);
        }
    }

    #[test]
    fn test_output_scales_input() {
        let mut env = Envelope::new(EnvelopeSettings::ar(0.0, 1000.0, 10.0), SR);
        assert_eq!(env.process(0.5, true), 0.5);
        assert_eq!(env.process(-0.25, false), -0.25);
    }
}
