// src/params.rs

//! The live parameter surface shared between the control thread and the audio thread.
//!
//! Every parameter is an independent atomic cell holding a fixed-point value
//! (`value * PARAM_SCALER`). There is no cross-field atomicity: the audio thread
//! reads each cell once per frame and clamps it to the declared range.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::{debug, warn};

// Scaler for storing float values in atomics. Leaves headroom for values up to ~42_000.
pub const PARAM_SCALER: f32 = 100_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Param {
    CellSpeed,
    CellRadius,
    MasterGain,
    MetronomeGain,
    AtmosGain,
    KeyLoopGain,
    KeyLoopPan,
    KeyHiGain,
    KeyHiPan,
    KeyLowGain,
    KeyLowPan,
    SynthLineGain,
    SynthLinePan,
    LowResFreq,
    LowResQ,
    DelayDryMix,
    DelayFeedback,
    DelayTime,
    ReverbDryMix,
    ReverbFeedback,
}

/// Declared default and valid range of a parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    pub default: f32,
    pub min: f32,
    pub max: f32,
}

impl ParamSpec {
    const fn new(default: f32, min: f32, max: f32) -> Self {
        Self { default, min, max }
    }

    pub fn contains(&self, value: f32) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn clamp(&self, value: f32) -> f32 {
        if value.is_nan() {
            return self.default;
        }
        value.clamp(self.min, self.max)
    }
}

impl Param {
    pub const COUNT: usize = 20;

    pub const ALL: [Param; Param::COUNT] = [
        Param::CellSpeed,
        Param::CellRadius,
        Param::MasterGain,
        Param::MetronomeGain,
        Param::AtmosGain,
        Param::KeyLoopGain,
        Param::KeyLoopPan,
        Param::KeyHiGain,
        Param::KeyHiPan,
        Param::KeyLowGain,
        Param::KeyLowPan,
        Param::SynthLineGain,
        Param::SynthLinePan,
        Param::LowResFreq,
        Param::LowResQ,
        Param::DelayDryMix,
        Param::DelayFeedback,
        Param::DelayTime,
        Param::ReverbDryMix,
        Param::ReverbFeedback,
    ];

    /// Stable identifier used in settings files.
    pub fn name(self) -> &'static str {
        match self {
            Param::CellSpeed => "cell_speed",
            Param::CellRadius => "cell_radius",
            Param::MasterGain => "master_gain",
            Param::MetronomeGain => "metronome_gain",
            Param::AtmosGain => "atmos_gain",
            Param::KeyLoopGain => "key_loop_gain",
            Param::KeyLoopPan => "key_loop_pan",
            Param::KeyHiGain => "key_hi_gain",
            Param::KeyHiPan => "key_hi_pan",
            Param::KeyLowGain => "key_low_gain",
            Param::KeyLowPan => "key_low_pan",
            Param::SynthLineGain => "synth_line_gain",
            Param::SynthLinePan => "synth_line_pan",
            Param::LowResFreq => "low_res_freq",
            Param::LowResQ => "low_res_q",
            Param::DelayDryMix => "delay_dry_mix",
            Param::DelayFeedback => "delay_feedback",
            Param::DelayTime => "delay_time",
            Param::ReverbDryMix => "reverb_dry_mix",
            Param::ReverbFeedback => "reverb_feedback",
        }
    }

    pub fn from_name(name: &str) -> Option<Param> {
        Param::ALL.iter().copied().find(|p| p.name() == name)
    }

    pub fn spec(self) -> ParamSpec {
        match self {
            Param::CellSpeed => ParamSpec::new(42.662, 0.0, 60.0),
            Param::CellRadius => ParamSpec::new(50.0, 0.0, 200.0),
            Param::MasterGain => ParamSpec::new(1.0, 0.0, 3.0),
            Param::MetronomeGain => ParamSpec::new(0.0, 0.0, 1.0),
            Param::AtmosGain => ParamSpec::new(0.3, 0.0, 1.0),
            Param::KeyLoopGain => ParamSpec::new(0.4, 0.0, 1.0),
            Param::KeyLoopPan => ParamSpec::new(0.3, 0.0, 1.0),
            Param::KeyHiGain => ParamSpec::new(0.15, 0.0, 1.0),
            Param::KeyHiPan => ParamSpec::new(0.8, 0.0, 1.0),
            Param::KeyLowGain => ParamSpec::new(0.18, 0.0, 1.0),
            Param::KeyLowPan => ParamSpec::new(0.1, 0.0, 1.0),
            Param::SynthLineGain => ParamSpec::new(0.01, 0.0, 0.05),
            Param::SynthLinePan => ParamSpec::new(0.05, 0.0, 1.0),
            Param::LowResFreq => ParamSpec::new(4000.0, 0.0, 4000.0),
            Param::LowResQ => ParamSpec::new(0.5, 0.0, 4.0),
            Param::DelayDryMix => ParamSpec::new(0.7, 0.0, 1.0),
            Param::DelayFeedback => ParamSpec::new(0.5, 0.0, 0.9),
            Param::DelayTime => ParamSpec::new(0.9, 0.0, 2.0),
            Param::ReverbDryMix => ParamSpec::new(0.7, 0.0, 1.0),
            Param::ReverbFeedback => ParamSpec::new(0.95, 0.0, 0.99),
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[inline]
fn encode(value: f32) -> u32 {
    // Saturating cast: negatives land on 0, which is the lower bound of every range.
    (value * PARAM_SCALER).round() as u32
}

#[inline]
fn decode(raw: u32) -> f32 {
    raw as f32 / PARAM_SCALER
}

/// The table of live parameters. Shared as `Arc<SharedParams>`.
#[derive(Debug)]
pub struct SharedParams {
    values: [AtomicU32; Param::COUNT],
}

impl Default for SharedParams {
    fn default() -> Self {
        Self {
            values: Param::ALL.map(|p| AtomicU32::new(encode(p.spec().default))),
        }
    }
}

impl SharedParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// The stored value, which may lie outside the declared range.
    pub fn get(&self, param: Param) -> f32 {
        decode(self.values[param.index()].load(Ordering::Relaxed))
    }

    /// The stored value clamped to the declared range. This is what the audio thread uses.
    #[inline]
    pub fn get_clamped(&self, param: Param) -> f32 {
        param.spec().clamp(self.get(param))
    }

    /// Overwrites a parameter. Returns `false` (and logs) when the value is outside
    /// the declared range; the value is still stored and clamped on read.
    pub fn set(&self, param: Param, value: f32) -> bool {
        let in_range = param.spec().contains(value);
        if !in_range {
            let spec = param.spec();
            warn!(
                param = param.name(),
                value,
                min = spec.min,
                max = spec.max,
                "Parameter written outside its range, will be clamped on use"
            );
        }
        self.values[param.index()].store(encode(value), Ordering::Relaxed);
        in_range
    }

    /// Name-based write used for settings overrides. `None` if the name is unknown.
    pub fn set_by_name(&self, name: &str, value: f32) -> Option<bool> {
        Param::from_name(name).map(|p| self.set(p, value))
    }

    pub fn apply_overrides(&self, overrides: &BTreeMap<String, f32>) {
        for (name, &value) in overrides {
            match self.set_by_name(name, value) {
                Some(_) => debug!(param = name.as_str(), value, "Applied parameter override"),
                None => warn!(param = name.as_str(), "Unknown parameter in settings, ignored"),
            }
        }
    }

    /// Current values keyed by parameter name.
    pub fn snapshot(&self) -> BTreeMap<String, f32> {
        Param::ALL
            .iter()
            .map(|&p| (p.name().to_string(), self.get(p)))
            .collect()
    }

    pub fn reset_to_defaults(&self) {
        for p in Param::ALL {
            self.values[p.index()].store(encode(p.spec().default), Ordering::Relaxed);
        }
    }

    /// Reads every parameter once, clamped, for one output frame.
    #[inline]
    pub fn frame(&self) -> FrameParams {
        FrameParams {
            cell_speed: self.get_clamped(Param::CellSpeed),
            master_gain: self.get_clamped(Param::MasterGain),
            metronome_gain: self.get_clamped(Param::MetronomeGain),
            atmos_gain: self.get_clamped(Param::AtmosGain),
            key_loop_gain: self.get_clamped(Param::KeyLoopGain),
            key_loop_pan: self.get_clamped(Param::KeyLoopPan),
            key_hi_gain: self.get_clamped(Param::KeyHiGain),
            key_hi_pan: self.get_clamped(Param::KeyHiPan),
            key_low_gain: self.get_clamped(Param::KeyLowGain),
            key_low_pan: self.get_clamped(Param::KeyLowPan),
            synth_line_gain: self.get_clamped(Param::SynthLineGain),
            synth_line_pan: self.get_clamped(Param::SynthLinePan),
            low_res_freq: self.get_clamped(Param::LowResFreq),
            low_res_q: self.get_clamped(Param::LowResQ),
            delay_dry_mix: self.get_clamped(Param::DelayDryMix),
            delay_feedback: self.get_clamped(Param::DelayFeedback),
            delay_time: self.get_clamped(Param::DelayTime),
            reverb_dry_mix: self.get_clamped(Param::ReverbDryMix),
            reverb_feedback: self.get_clamped(Param::ReverbFeedback),
        }
    }
}

/// Plain copy of the audio-relevant parameters for a single frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameParams {
    pub cell_speed: f32,
    pub master_gain: f32,
    pub metronome_gain: f32,
    pub atmos_gain: f32,
    pub key_loop_gain: f32,
    pub key_loop_pan: f32,
    pub key_hi_gain: f32,
    pub key_hi_pan: f32,
    pub key_low_gain: f32,
    pub key_low_pan: f32,
    pub synth_line_gain: f32,
    pub synth_line_pan: f32,
    pub low_res_freq: f32,
    pub low_res_q: f32,
    pub delay_dry_mix: f32,
    pub delay_feedback: f32,
    pub delay_time: f32,
    pub reverb_dry_mix: f32,
    pub reverb_feedback: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_declared_specs() {
        let params = SharedParams::new();
        for p in Param::ALL {
            let expected = p.spec().default;
            assert!(
                (params.get(p) - expected).abs() < 1e-4,
                "{} default {} != {}",
                p,
                params.get(p),
                expected
            );
        }
    }

    #[test]
    fn test_all_names_round_trip() {
        for p in Param::ALL {
            assert_eq!(Param::from_name(p.name()), Some(p));
        }
        assert_eq!(Param::from_name("not_a_param"), None);
    }

    #[test]
    fn test_out_of_range_writes_are_clamped_on_read() {
        let params = SharedParams::new();
        assert!(!params.set(Param::DelayFeedback, 1.5));
        assert!((params.get(Param::DelayFeedback) - 1.5).abs() < 1e-4);
        assert!((params.get_clamped(Param::DelayFeedback) - 0.9).abs() < 1e-6);

        assert!(!params.set(Param::DelayTime, -1.0));
        assert_eq!(params.get_clamped(Param::DelayTime), 0.0);
    }

    #[test]
    fn test_in_range_write() {
        let params = SharedParams::new();
        assert!(params.set(Param::LowResFreq, 1234.5));
        assert!((params.frame().low_res_freq - 1234.5).abs() < 1e-2);
    }

    #[test]
    fn test_overrides_and_snapshot() {
        let params = SharedParams::new();
        let mut overrides = BTreeMap::new();
        overrides.insert("master_gain".to_string(), 2.0);
        overrides.insert("bogus".to_string(), 1.0);
        params.apply_overrides(&overrides);

        let snapshot = params.snapshot();
        assert_eq!(snapshot.len(), Param::COUNT);
        assert!((snapshot["master_gain"] - 2.0).abs() < 1e-4);

        params.reset_to_defaults();
        assert!((params.get(Param::MasterGain) - 1.0).abs() < 1e-4);
    }
}
