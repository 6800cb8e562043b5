//! Decoded frame handle shared between the worker thread and the presenter
//!
//! **Why**: The worker publishes the frame it computed for the current playing
//! offset and the presenter polls it on every render tick. Cloning must be
//! cheap (an `Arc` bump), so the pixel payload lives behind a shared pointer
//! and is immutable once decoded.
//!
//! **Used by**: `MediaBuffer` (slot contents), `StreamEngine::current_frame()`
//! (presenter polling), demo binary (synthetic frames)

use std::sync::Arc;

/// Internal immutable pixel payload
#[derive(Debug)]
struct FrameData {
    pixels: Vec<u8>,
    width: u32,
    height: u32,
}

/// Single decoded frame (RGBA, 4 bytes/pixel)
///
/// Opaque to the engine: it never inspects pixels, only hands the frame to
/// the presenter. `Clone` is an `Arc` clone - cheap!
#[derive(Debug, Clone)]
pub struct Frame {
    data: Arc<FrameData>,
}

impl Frame {
    /// Create a frame from an RGBA pixel buffer
    pub fn from_rgba(pixels: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            data: Arc::new(FrameData {
                pixels,
                width,
                height,
            }),
        }
    }

    /// Frame width in pixels
    pub fn width(&self) -> u32 {
        self.data.width
    }

    /// Frame height in pixels
    pub fn height(&self) -> u32 {
        self.data.height
    }

    /// (width, height) pair
    pub fn size(&self) -> (u32, u32) {
        (self.data.width, self.data.height)
    }

    /// Raw RGBA bytes, `width * height * 4` long for a fully decoded frame
    pub fn pixels(&self) -> &[u8] {
        &self.data.pixels
    }

    /// True when both handles point at the same decoded payload
    pub fn same_frame(&self, other: &Frame) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}
