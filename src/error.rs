//! Engine error type
//!
//! Decoder failures never surface here: a broken source reports
//! end-of-stream through `FrameSource::fetch` and playback winds down
//! normally. What is fatal is losing the background thread itself.

use std::fmt;

/// Fatal streaming-engine errors
#[derive(Debug)]
pub enum StreamError {
    /// The worker thread could not be spawned
    ThreadSpawn(std::io::Error),
    /// The worker thread panicked; its buffer ring and source are lost
    WorkerJoin,
    /// The engine has no streaming core left after a previous fatal thread
    /// error; the instance must be rebuilt
    Detached,
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamError::ThreadSpawn(e) => write!(f, "failed to spawn stream worker: {}", e),
            StreamError::WorkerJoin => write!(f, "stream worker panicked"),
            StreamError::Detached => write!(f, "streaming core lost after worker failure"),
        }
    }
}

impl std::error::Error for StreamError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StreamError::ThreadSpawn(e) => Some(e),
            _ => None,
        }
    }
}
