// src/audio_engine/scope.rs

//! Per-frame data feed for the cell animation. The audio thread pushes, the
//! render thread drains; frames are dropped when the render side falls behind.

use ringbuf::{HeapConsumer, HeapProducer, HeapRb};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub const SCOPE_CAPACITY: usize = 8192;
/// Points the cell outline is drawn with.
pub const CELL_POINTS: usize = 255;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScopeFrame {
    /// The cell-animation sine.
    pub cell: f32,
    /// Sum of the four hit voices' enveloped output.
    pub hits: f32,
}

pub fn scope_channel(capacity: usize) -> (ScopeWriter, ScopeReader) {
    let (producer, consumer) = HeapRb::<ScopeFrame>::new(capacity.max(1)).split();
    let dropped = Arc::new(AtomicU64::new(0));
    (
        ScopeWriter {
            producer,
            dropped: dropped.clone(),
        },
        ScopeReader { consumer, dropped },
    )
}

pub struct ScopeWriter {
    producer: HeapProducer<ScopeFrame>,
    dropped: Arc<AtomicU64>,
}

impl ScopeWriter {
    #[inline]
    pub fn push(&mut self, frame: ScopeFrame) {
        if self.producer.push(frame).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }
}

pub struct ScopeReader {
    consumer: HeapConsumer<ScopeFrame>,
    dropped: Arc<AtomicU64>,
}

impl ScopeReader {
    /// Fills `out` with the most recent frames, discarding anything older.
    /// Returns how many were written.
    pub fn read_latest(&mut self, out: &mut [ScopeFrame]) -> usize {
        let excess = self.consumer.len().saturating_sub(out.len());
        if excess > 0 {
            self.consumer.skip(excess);
        }
        self.consumer.pop_slice(out)
    }

    /// Frames lost because the buffer was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Outline of the cell: point `i` sits at angle `i` radians, pushed out by the
/// animation sine and, more strongly, by the hit envelopes.
pub fn cell_outline(frames: &[ScopeFrame], radius: f32) -> Vec<(f32, f32)> {
    frames
        .iter()
        .take(CELL_POINTS)
        .enumerate()
        .map(|(i, frame)| {
            let extent = (frame.cell + 10.0 * frame.hits) * radius;
            let angle = i as f32;
            (extent * angle.cos(), extent * angle.sin())
        })
        .collect()
}
