// src/lib.rs

//! Audio core of the Iota toy: sample voices and envelopes, a tick clock driving
//! polyrhythmic step patterns, a stereo mixer, and a filter, delay and reverb
//! chain, all rendered per sample inside the host's audio callback.

pub mod assets;
pub mod audio_device;
pub mod audio_engine;
pub mod audio_io;
pub mod clock;
pub mod control;
pub mod envelope;
pub mod error;
pub mod fx_chain;
pub mod fx_components;
pub mod mixer;
pub mod oscillator;
pub mod params;
pub mod pattern;
pub mod sample_buffer;
pub mod sample_player;
pub mod sequencer;
pub mod settings;
pub mod theory;
