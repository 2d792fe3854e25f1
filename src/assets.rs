// src/assets.rs

//! The fixed set of sample assets and how they are located and loaded at startup.

use crate::error::LoadError;
use crate::sample_buffer::SampleBuffer;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

/// Every sample-backed instrument slot in the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SampleSlot {
    Metronome,
    HitHi,
    HitMid,
    HitLow,
    HitSub,
    Atmos,
    KeyArp,
    KeyHi,
    KeyLow,
}

impl SampleSlot {
    pub const COUNT: usize = 9;

    pub const ALL: [SampleSlot; SampleSlot::COUNT] = [
        SampleSlot::Metronome,
        SampleSlot::HitHi,
        SampleSlot::HitMid,
        SampleSlot::HitLow,
        SampleSlot::HitSub,
        SampleSlot::Atmos,
        SampleSlot::KeyArp,
        SampleSlot::KeyHi,
        SampleSlot::KeyLow,
    ];

    /// Path of the asset relative to the data directory.
    pub fn relative_path(self) -> &'static str {
        match self {
            SampleSlot::Metronome => "audio/samples/rim.wav",
            SampleSlot::HitHi => "audio/samples/synthSpace_hi.wav",
            SampleSlot::HitMid => "audio/samples/synthSpace_mid.wav",
            SampleSlot::HitLow => "audio/samples/synthSpace_low.wav",
            SampleSlot::HitSub => "audio/samples/subAtmosphere.wav",
            SampleSlot::Atmos => "audio/loops/atmosphere.wav",
            SampleSlot::KeyArp => "audio/loops/keyArploop.wav",
            SampleSlot::KeyHi => "audio/loops/keysLoopHi.wav",
            SampleSlot::KeyLow => "audio/loops/keysLoopLow.wav",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for SampleSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SampleSlot::Metronome => "metronome",
            SampleSlot::HitHi => "hit hi",
            SampleSlot::HitMid => "hit mid",
            SampleSlot::HitLow => "hit low",
            SampleSlot::HitSub => "hit sub",
            SampleSlot::Atmos => "atmosphere loop",
            SampleSlot::KeyArp => "key arp loop",
            SampleSlot::KeyHi => "keys hi loop",
            SampleSlot::KeyLow => "keys low loop",
        };
        write!(f, "{}", name)
    }
}

/// Turns an asset's relative path into a file on disk.
pub trait PathResolver: Sync {
    fn resolve(&self, relative: &str) -> PathBuf;
}

impl<F> PathResolver for F
where
    F: Fn(&str) -> PathBuf + Sync,
{
    fn resolve(&self, relative: &str) -> PathBuf {
        self(relative)
    }
}

/// Resolves against a data directory. If the exact relative path does not exist,
/// the directory tree is searched for a file with the same name.
#[derive(Debug, Clone)]
pub struct DataDirResolver {
    root: PathBuf,
}

impl DataDirResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl PathResolver for DataDirResolver {
    fn resolve(&self, relative: &str) -> PathBuf {
        let direct = self.root.join(relative);
        if direct.exists() {
            return direct;
        }
        let filename = relative.rsplit(|c| c == '/' || c == '\\').next();
        if let Some(filename) = filename {
            for entry in WalkDir::new(&self.root).into_iter().filter_map(|e| e.ok()) {
                if entry.file_type().is_file() && entry.file_name() == filename {
                    return entry.path().to_path_buf();
                }
            }
        }
        direct
    }
}

/// Decoded buffers for every slot. A `None` slot plays silence.
#[derive(Debug, Clone, Default)]
pub struct SampleBank {
    slots: [Option<SampleBuffer>; SampleSlot::COUNT],
}

impl SampleBank {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, slot: SampleSlot) -> Option<&SampleBuffer> {
        self.slots[slot.index()].as_ref()
    }

    pub fn insert(&mut self, slot: SampleSlot, buffer: SampleBuffer) {
        self.slots[slot.index()] = Some(buffer);
    }

    pub fn loaded_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }
}

fn load_slot(
    slot: SampleSlot,
    resolver: &dyn PathResolver,
    target_sr: u32,
) -> Result<SampleBuffer, LoadError> {
    let path = resolver.resolve(slot.relative_path());
    if !path.is_file() {
        return Err(LoadError::Missing { slot, path });
    }
    SampleBuffer::load_wav(&path, target_sr)
}

/// Loads every asset, decoding in parallel. Never fails as a whole: each slot that
/// could not be loaded is reported and left empty.
pub fn load_samples(resolver: &dyn PathResolver, target_sr: u32) -> (SampleBank, Vec<LoadError>) {
    let results: Vec<(SampleSlot, Result<SampleBuffer, LoadError>)> = SampleSlot::ALL
        .as_slice()
        .par_iter()
        .map(|&slot| (slot, load_slot(slot, resolver, target_sr)))
        .collect();

    let mut bank = SampleBank::empty();
    let mut errors = Vec::new();
    for (slot, result) in results {
        match result {
            Ok(buffer) => {
                info!(%slot, frames = buffer.len(), "Loaded sample");
                bank.insert(slot, buffer);
            }
            Err(e) => {
                warn!(%slot, error = %e, "Sample failed to load, voice will be silent");
                errors.push(e);
            }
        }
    }
    (bank, errors)
}

/// Convenience for the common case of a plain data directory.
pub fn load_samples_from_dir(dir: &Path, target_sr: u32) -> (SampleBank, Vec<LoadError>) {
    load_samples(&DataDirResolver::new(dir), target_sr)
}
