// src/fx_components/mod.rs

pub mod delay;
pub mod filter;
pub mod reverb;

pub use delay::{DelayLine, DelaySettings};
pub use filter::{LowPassFilter, LowPassSettings};
pub use reverb::{ReverbBank, DEFAULT_TAP_COUNT};

/// One mono processing stage. Settings are read live every sample, so they are
/// passed in by value instead of being stored on the component.
pub trait DspComponent: Send {
    type Settings: Copy;

    fn process(&mut self, input: f32, settings: Self::Settings) -> f32;
}
