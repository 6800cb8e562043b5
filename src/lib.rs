//! REEL - Streaming media playback engine
//!
//! Turns a bursty, blocking frame decoder into smooth, clock-synchronized,
//! loopable playback. A small ring of prefetch buffers is serviced by a
//! background worker thread; the presenter polls the current frame and the
//! playing offset on every render tick.
//!
//! The engine never decodes anything itself - supply a [`FrameSource`]
//! adapter at construction. Rendering, windowing and GPU upload are equally
//! out of scope: [`StreamEngine::current_frame`] hands out a cheap shared
//! pixel-buffer handle and leaves presentation to the host.

pub mod buffer;
pub mod cli;
pub mod clock;
pub mod engine;
pub mod error;
pub mod frame;
pub mod ring;
pub mod source;

mod worker;

// Re-export the public surface
pub use buffer::MediaBuffer;
pub use clock::{PlaybackClock, frame_index};
pub use engine::{Status, StreamEngine};
pub use error::StreamError;
pub use frame::Frame;
pub use ring::{BufferRing, RING_SLOTS};
pub use source::{FrameChunk, FrameSource, StreamInfo};
