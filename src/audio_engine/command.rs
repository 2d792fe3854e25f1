// src/audio_engine/command.rs

/// Discrete events sent from the control thread. Drained at the start of every callback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AudioCommand {
    /// Switch to one of the built-in pattern sets. Out-of-range indices are ignored.
    SetPattern(usize),
    /// Advance to the next pattern set and play the low hit.
    NewLevelLoaded,
    /// Play the sub hit and switch to the sparse completion patterns.
    LevelComplete,
    SetTempo(f64),
    SetTicksPerBeat(u32),
    /// Restart the play-head and clock so the next frame ticks.
    ResetTransport,
}

/// Commands the engine can hold before the control side starts dropping them.
pub const COMMAND_QUEUE_CAPACITY: usize = 256;
