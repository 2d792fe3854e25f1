// src/sample_player.rs

//! Variable-speed playback of a shared `SampleBuffer`.

use crate::sample_buffer::SampleBuffer;

/// Read head over one sample buffer. Without a buffer every read is silence.
#[derive(Debug, Clone, Default)]
pub struct SamplePlayer {
    buffer: Option<SampleBuffer>,
    position: f64,
}

impl SamplePlayer {
    pub fn new(buffer: Option<SampleBuffer>) -> Self {
        Self {
            buffer,
            position: 0.0,
        }
    }

    /// A one-shot voice that has not been triggered yet stays silent.
    pub fn idle(buffer: Option<SampleBuffer>) -> Self {
        let position = buffer.as_ref().map_or(0.0, |b| b.len() as f64);
        Self { buffer, position }
    }

    pub fn is_loaded(&self) -> bool {
        self.buffer.as_ref().is_some_and(|b| !b.is_empty())
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    /// Hard restart from the first sample. No crossfade.
    #[inline]
    pub fn trigger(&mut self) {
        self.position = 0.0;
    }

    /// One-shot read: returns the sample at the read head, then advances by `speed`.
    /// Past the end it yields silence until retriggered.
    #[inline]
    pub fn play_once(&mut self, speed: f32) -> f32 {
        let Some(buffer) = &self.buffer else {
            return 0.0;
        };
        let data = buffer.samples();
        if self.position < 0.0 || self.position >= data.len() as f64 {
            return 0.0;
        }
        let out = read_linear(data, self.position, false);
        self.position += speed.max(0.0) as f64;
        out
    }

    /// Looping read: the read head wraps at the buffer end.
    #[inline]
    pub fn play(&mut self, speed: f32) -> f32 {
        let Some(buffer) = &self.buffer else {
            return 0.0;
        };
        let data = buffer.samples();
        if data.is_empty() {
            return 0.0;
        }
        let len = data.len() as f64;
        self.position = self.position.rem_euclid(len);
        let out = read_linear(data, self.position, true);
        self.position = (self.position + speed.max(0.0) as f64).rem_euclid(len);
        out
    }
}

/// Linear interpolation between the two samples around `position`.
#[inline(always)]
fn read_linear(data: &[f32], position: f64, wrap: bool) -> f32 {
    let index1 = position.floor() as usize;
    let fraction = (position - index1 as f64) as f32;
    let sample1 = data[index1];
    let index2 = index1 + 1;
    let sample2 = if index2 < data.len() {
        data[index2]
    } else if wrap {
        data[0]
    } else {
        0.0
    };
    sample1 + fraction * (sample2 - sample1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(len: usize) -> SampleBuffer {
        SampleBuffer::new((0..len).map(|i| i as f32).collect(), 44100)
    }

    #[test]
    fn test_play_once_then_silence() {
        let mut player = SamplePlayer::new(Some(ramp(3)));
        assert_eq!(player.play_once(1.0), 0.0);
        assert_eq!(player.play_once(1.0), 1.0);
        assert_eq!(player.play_once(1.0), 2.0);
        assert_eq!(player.play_once(1.0), 0.0);
        assert_eq!(player.play_once(1.0), 0.0);
    }

    #[test]
    fn test_trigger_restarts_mid_playback() {
        let mut player = SamplePlayer::new(Some(ramp(100)));
        for _ in 0..42 {
            player.play_once(1.0);
        }
        player.trigger();
        assert_eq!(player.position(), 0.0);
        assert_eq!(player.play_once(1.0), 0.0);
        assert_eq!(player.play_once(1.0), 1.0);
    }

    #[test]
    fn test_idle_player_is_silent_until_triggered() {
        let mut player = SamplePlayer::idle(Some(ramp(4)));
        assert_eq!(player.play_once(1.0), 0.0);
        player.trigger();
        player.play_once(1.0);
        assert_eq!(player.play_once(1.0), 1.0);
    }

    #[test]
    fn test_fractional_speed_interpolates() {
        let mut player = SamplePlayer::new(Some(ramp(10)));
        let reads: Vec<f32> = (0..4).map(|_| player.play_once(0.5)).collect();
        assert_eq!(reads, vec![0.0, 0.5, 1.0, 1.5]);

        let mut fast = SamplePlayer::new(Some(ramp(10)));
        let reads: Vec<f32> = (0..3).map(|_| fast.play_once(2.0)).collect();
        assert_eq!(reads, vec![0.0, 2.0, 4.0]);
    }

    #[test]
    fn test_looping_wraps() {
        let mut player = SamplePlayer::new(Some(ramp(3)));
        let reads: Vec<f32> = (0..7).map(|_| player.play(1.0)).collect();
        assert_eq!(reads, vec![0.0, 1.0, 2.0, 0.0, 1.0, 2.0, 0.0]);
    }

    #[test]
    fn test_missing_buffer_is_silent() {
        let mut player = SamplePlayer::new(None);
        assert!(!player.is_loaded());
        player.trigger();
        assert_eq!(player.play_once(1.0), 0.0);
        assert_eq!(player.play(1.0), 0.0);
    }
}
