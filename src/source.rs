//! Frame source seam: the engine's view of a media decoder
//!
//! **Why**: The engine never decodes a frame itself. A `FrameSource` adapter
//! wraps whatever actually produces pixels (file demuxer, capture device,
//! procedural generator) behind two calls: pull a batch, reposition the
//! cursor. Decode latency is opaque; both calls may block, which is why the
//! worker thread owns the source while playback runs.
//!
//! **Used by**: `BufferRing::fill_slot` (pulling batches, loop restarts),
//! `StreamEngine` (seeks while no worker owns the source)

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::frame::Frame;

/// Result of one `fetch` call
#[derive(Debug)]
pub struct FrameChunk {
    /// Decoded frames, in source order; may be fewer than requested
    pub frames: Vec<Frame>,
    /// True when the source has no more frames before wrapping/stopping.
    /// A decoder hard error is reported the same way: zero frames with
    /// `reached_end` set, from then on terminally.
    pub reached_end: bool,
}

impl FrameChunk {
    /// Chunk carrying frames
    pub fn frames(frames: Vec<Frame>, reached_end: bool) -> Self {
        Self { frames, reached_end }
    }

    /// Empty end-of-stream chunk
    pub fn end() -> Self {
        Self {
            frames: Vec::new(),
            reached_end: true,
        }
    }
}

/// Supplier of decoded frames, owned by the worker thread during playback
///
/// `fetch` must be repeatedly callable with no side effect other than
/// advancing the internal read cursor.
pub trait FrameSource: Send {
    /// Return up to `requested` frames from the current cursor position
    fn fetch(&mut self, requested: usize) -> FrameChunk;

    /// Reposition the read cursor
    ///
    /// Used for explicit seeks and for loop restarts. Semantics for an
    /// offset past the end (clamp or wrap) are the source's choice; the
    /// engine does not validate the offset.
    fn seek(&mut self, offset: Duration);
}

/// Static stream metadata, supplied once at engine construction
///
/// The engine's `duration()`, `frame_rate()` and `size()` getters all derive
/// from this; the source itself only ever reports frames and end-of-stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamInfo {
    pub width: u32,
    pub height: u32,
    /// Frames per second; also the batch size for one ring fill
    pub frame_rate: u32,
    /// Total frames in the stream
    pub frame_count: u64,
}

impl StreamInfo {
    /// (width, height) pair
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Total stream duration, derived from frame count and rate
    pub fn duration(&self) -> Duration {
        if self.frame_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frame_count as f64 / self.frame_rate as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Test: StreamInfo duration derivation
    /// Validates: 240 frames at 24 fps is exactly 10 seconds
    #[test]
    fn test_info_duration() {
        let info = StreamInfo {
            width: 320,
            height: 240,
            frame_rate: 24,
            frame_count: 240,
        };
        assert_eq!(info.duration(), Duration::from_secs(10));
        assert_eq!(info.size(), (320, 240));
    }
}
