// src/error.rs

//! Typed errors for the parts of the crate that can fail outside the audio thread.

use crate::assets::SampleSlot;
use std::path::PathBuf;

/// A sample asset could not be turned into a playable buffer.
/// The affected voice stays silent for the lifetime of the engine.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("sample for {slot} not found at {}", path.display())]
    Missing { slot: SampleSlot, path: PathBuf },
    #[error("failed to decode {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },
    #[error("unsupported sample format in {}: {detail}", path.display())]
    UnsupportedFormat { path: PathBuf, detail: String },
    #[error("failed to resample {}: {detail}", path.display())]
    Resample { path: PathBuf, detail: String },
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum PatternError {
    #[error("pattern must contain at least one step")]
    Empty,
    #[error("pattern length {len} is not a power of two")]
    NotPowerOfTwo { len: usize },
    #[error("at least one pattern set is required")]
    NoSets,
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("settings file I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("settings file parse error: {0}")]
    Parse(#[from] serde_json::Error),
}
