//! One ring slot's batch of decoded frames plus timing metadata
//!
//! **Why**: The decoder hands over frames in one-second batches; playback
//! needs to know how long a batch lasts to decide when to switch slots.
//! Duration is always derived from `frame_count / frame_rate` at call time,
//! never stored, so it can't go stale when the slot is refilled.
//!
//! **Used by**: `BufferRing` (slot storage), worker playback (frame lookup,
//! hand-over timing)

use std::time::Duration;

use crate::frame::Frame;

/// A batch of decoded frames backing one ring slot
///
/// Contents are replaced in place on every refill: `load()` reuses the
/// existing `Vec` allocation, so after the first fill pass the ring causes
/// no per-refill allocation churn for the frame list itself.
#[derive(Debug, Default)]
pub struct MediaBuffer {
    frames: Vec<Frame>,
    frame_rate: u32,
}

impl MediaBuffer {
    /// Empty buffer, to be filled by the ring
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the buffer contents with a new batch of frames
    ///
    /// An empty `frames` leaves the buffer empty (no partial-fill state:
    /// contents are either fully replaced or cleared).
    pub fn load(&mut self, frames: Vec<Frame>, frame_rate: u32) {
        self.frames.clear();
        self.frames.extend(frames);
        self.frame_rate = frame_rate;
    }

    /// Drop the contents, keeping the allocation for the next refill
    pub fn clear(&mut self) {
        self.frames.clear();
    }

    /// Frame at `index`
    ///
    /// Bounds are the caller's responsibility at this layer - the playback
    /// side computes indexes from the clock and an out-of-range index is a
    /// programming error, not a recoverable condition.
    pub fn frame(&self, index: usize) -> &Frame {
        &self.frames[index]
    }

    /// Number of frames currently loaded
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Frames per second of the loaded batch
    pub fn frame_rate(&self) -> u32 {
        self.frame_rate
    }

    /// True when no frames are loaded
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Playable duration of the batch, recomputed from count and rate
    pub fn duration(&self) -> Duration {
        if self.frame_rate == 0 || self.frames.is_empty() {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames.len() as f64 / self.frame_rate as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_frames(n: usize) -> Vec<Frame> {
        (0..n).map(|_| Frame::from_rgba(vec![0u8; 4], 1, 1)).collect()
    }

    /// Test: Duration is recomputed from count and rate
    /// Validates: No stored duration can go stale across refills
    #[test]
    fn test_duration_follows_reload() {
        let mut buffer = MediaBuffer::new();

        buffer.load(dummy_frames(24), 24);
        assert_eq!(buffer.duration(), Duration::from_secs(1));
        assert_eq!(buffer.frame_count(), 24);

        buffer.load(dummy_frames(12), 24);
        assert_eq!(buffer.duration(), Duration::from_millis(500));
        assert_eq!(buffer.frame_count(), 12);
    }

    /// Test: Loading zero frames empties the buffer
    /// Validates: No partial-fill state, empty load is silent
    #[test]
    fn test_empty_load() {
        let mut buffer = MediaBuffer::new();
        buffer.load(dummy_frames(10), 25);
        buffer.load(Vec::new(), 25);

        assert!(buffer.is_empty());
        assert_eq!(buffer.duration(), Duration::ZERO);
    }

    /// Test: Zero frame rate yields zero duration
    /// Validates: No division by zero on an unconfigured buffer
    #[test]
    fn test_zero_rate_duration() {
        let mut buffer = MediaBuffer::new();
        buffer.load(dummy_frames(5), 0);
        assert_eq!(buffer.duration(), Duration::ZERO);
    }
}
