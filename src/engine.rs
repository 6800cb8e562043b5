//! Public playback state machine: Stopped / Paused / Playing
//!
//! **Why**: Everything the presenter and controller see goes through here.
//! The engine owns the playing-offset clock and the streaming core; while a
//! worker runs it holds only a join handle plus the read-only observer
//! block, and serializes with the worker through thread join - never through
//! a mutex over engine fields.
//!
//! **Used by**: presenter/render loop (polling `current_frame()` and
//! `playing_offset()` each tick), controller (transport calls)
//!
//! # Threading contract
//!
//! All methods are called from one controller thread. `play()` and
//! `set_playing_offset()` may block briefly on `FrameSource::seek` (the
//! engine owns the source whenever no worker is running, so the call cannot
//! race). `pause()`/`stop()` block on the worker join, bounded by one tick
//! plus at most one in-flight decode.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::clock::{PlaybackClock, frame_index};
use crate::error::StreamError;
use crate::frame::Frame;
use crate::ring::BufferRing;
use crate::source::{FrameSource, StreamInfo};
use crate::worker::{self, Launch, SharedState, StreamCore, WorkerHandle};

/// Playback status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum Status {
    /// Not playing; the initial and natural rest state
    Stopped = 0,
    /// Playback suspended, position retained
    Paused = 1,
    /// Playing (reported immediately after `play()`, even before the worker
    /// has produced its first frame)
    Playing = 2,
}

impl Status {
    pub(crate) fn to_u8(self) -> u8 {
        self as u8
    }

    pub(crate) fn from_u8(raw: u8) -> Status {
        match raw {
            1 => Status::Paused,
            2 => Status::Playing,
            _ => Status::Stopped,
        }
    }
}

/// Streaming playback engine: one per playable source
pub struct StreamEngine {
    info: StreamInfo,
    state: Status,
    clock: PlaybackClock,
    looping: Arc<AtomicBool>,
    shared: Arc<SharedState>,
    /// Present whenever no worker is running
    core: Option<StreamCore>,
    /// Present while a worker is running
    worker: Option<WorkerHandle>,
}

impl StreamEngine {
    /// Build an engine around a frame source and its metadata
    ///
    /// The ring's slots are allocated here once and recycled for the
    /// engine's lifetime.
    pub fn new(info: StreamInfo, source: Box<dyn FrameSource>) -> Self {
        info!(
            "Stream engine created: {}x{} @ {} fps, {} frame(s)",
            info.width, info.height, info.frame_rate, info.frame_count
        );
        Self {
            info,
            state: Status::Stopped,
            clock: PlaybackClock::new(),
            looping: Arc::new(AtomicBool::new(false)),
            shared: Arc::new(SharedState::new()),
            core: Some(StreamCore::new(BufferRing::new(info.frame_rate), source)),
            worker: None,
        }
    }

    /// Start or resume playback
    ///
    /// From `Stopped`: seeks the source to 0, resets the frames-processed
    /// counter and launches a fresh worker. From `Paused`: restarts the
    /// clock anchor and relaunches the worker over the retained ring state,
    /// without reseeking. Already `Playing`: no-op.
    pub fn play(&mut self) -> Result<(), StreamError> {
        self.reconcile()?;
        match self.state {
            Status::Playing => Ok(()),
            Status::Paused => {
                debug!("Resuming playback");
                self.clock.restart();
                self.launch(Launch::Resume)
            }
            Status::Stopped => {
                debug!("Starting playback from offset 0");
                let core = self.core.as_mut().ok_or(StreamError::Detached)?;
                core.source.seek(Duration::ZERO);
                core.player.reset();
                core.stop_requested = false;
                self.shared.frames_processed.store(0, Ordering::Relaxed);
                self.clock.reset();
                self.launch(Launch::Fresh)
            }
        }
    }

    /// Suspend playback, retaining position and ring state
    ///
    /// No-op unless currently `Playing`. Joins the worker and banks the
    /// elapsed wall time into the playing offset.
    pub fn pause(&mut self) -> Result<(), StreamError> {
        self.reconcile()?;
        if self.state != Status::Playing {
            return Ok(());
        }
        let worker = self.worker.take().ok_or(StreamError::Detached)?;
        let finished = self.shared.status() == Status::Stopped;
        self.core = Some(worker.stop_and_join()?);
        if finished || self.shared.status() == Status::Stopped {
            // The worker completed naturally while we were asking it to
            // pause; settle into Stopped instead of Paused.
            self.settle_stopped();
            return Ok(());
        }
        self.clock.bank();
        self.state = Status::Paused;
        self.shared.set_status(Status::Paused);
        info!("Playback paused at {:?}", self.clock.offset(false));
        Ok(())
    }

    /// Stop playback: pause, zero the playing offset, discard ring contents
    ///
    /// The next `play()` starts a fresh worker from offset 0.
    pub fn stop(&mut self) -> Result<(), StreamError> {
        self.pause()?;
        self.settle_stopped();
        info!("Playback stopped");
        Ok(())
    }

    /// Seek: stop, reposition the source, prime the counters and clock to
    /// the target, then start a fresh worker without resetting them
    pub fn set_playing_offset(&mut self, offset: Duration) -> Result<(), StreamError> {
        self.stop()?;
        let core = self.core.as_mut().ok_or(StreamError::Detached)?;
        core.source.seek(offset);
        core.player.reset();
        core.stop_requested = false;
        self.shared
            .frames_processed
            .store(frame_index(offset, self.info.frame_rate), Ordering::Relaxed);
        self.clock.set(offset);
        debug!("Seek to {:?}", offset);
        self.launch(Launch::Fresh)
    }

    /// Current playing offset within this play session
    pub fn playing_offset(&self) -> Duration {
        self.clock.offset(self.status() == Status::Playing)
    }

    /// Enable or disable looping; consumed by the ring on its next fill
    pub fn set_looping(&self, looping: bool) {
        self.looping.store(looping, Ordering::Relaxed);
    }

    /// Current looping flag
    pub fn is_looping(&self) -> bool {
        self.looping.load(Ordering::Relaxed)
    }

    /// Current status; reflects the worker's natural completion without
    /// requiring a controller call in between
    pub fn status(&self) -> Status {
        match self.state {
            Status::Playing => self.shared.status(),
            other => other,
        }
    }

    /// Total stream duration
    pub fn duration(&self) -> Duration {
        self.info.duration()
    }

    /// Stream frame rate
    pub fn frame_rate(&self) -> u32 {
        self.info.frame_rate
    }

    /// Stream dimensions
    pub fn size(&self) -> (u32, u32) {
        self.info.size()
    }

    /// Most recently computed frame for the current offset, if any
    ///
    /// Pull-based: the engine never calls into the presenter.
    pub fn current_frame(&self) -> Option<Frame> {
        self.shared.current_frame()
    }

    /// Frames consumed since the last loop restart
    ///
    /// Resets whenever an end-marked slot is consumed, so the counter tracks
    /// position within the current loop iteration and never grows without
    /// bound on long-running loops.
    pub fn frames_processed(&self) -> u64 {
        self.shared.frames_processed.load(Ordering::Relaxed)
    }

    /// Buffers decoded ahead of the playhead; 0 while `Playing` is an
    /// observable underrun, tolerated by design
    pub fn pending_buffer_count(&self) -> usize {
        self.shared.pending_buffers.load(Ordering::Relaxed)
    }

    /// Fully played buffers awaiting refill
    pub fn used_buffer_count(&self) -> usize {
        self.shared.used_buffers.load(Ordering::Relaxed)
    }

    /// Hand the core to a fresh worker thread
    fn launch(&mut self, mode: Launch) -> Result<(), StreamError> {
        let core = self.core.take().ok_or(StreamError::Detached)?;
        // Publish Playing before the thread exists so callers never observe
        // a Stopped flicker between play() and the first decoded frame.
        self.shared.set_status(Status::Playing);
        match worker::spawn(core, self.shared.clone(), self.looping.clone(), mode) {
            Ok(handle) => {
                self.worker = Some(handle);
                self.state = Status::Playing;
                Ok(())
            }
            Err(e) => {
                // The closure owning the core was consumed by the failed
                // spawn; this engine can no longer stream.
                self.shared.set_status(Status::Stopped);
                self.state = Status::Stopped;
                Err(e)
            }
        }
    }

    /// Fold a naturally finished worker back into controller state
    fn reconcile(&mut self) -> Result<(), StreamError> {
        if self.worker.as_ref().is_some_and(|w| w.is_finished()) {
            let worker = self.worker.take().ok_or(StreamError::Detached)?;
            self.core = Some(worker.stop_and_join()?);
            self.settle_stopped();
            debug!("Worker finished naturally, engine settled to Stopped");
        }
        Ok(())
    }

    /// Common Stopped bookkeeping once no worker is running
    fn settle_stopped(&mut self) {
        self.state = Status::Stopped;
        self.clock.reset();
        self.shared.set_status(Status::Stopped);
        self.shared.clear_frame();
        self.shared.pending_buffers.store(0, Ordering::Relaxed);
        self.shared.used_buffers.store(0, Ordering::Relaxed);
        if let Some(core) = &mut self.core {
            core.ring.clear();
            core.player.reset();
            core.stop_requested = false;
        }
    }
}

impl Drop for StreamEngine {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.stop_and_join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::FrameChunk;
    use std::sync::Mutex;
    use std::thread::sleep;

    /// Scripted source shared with the test through handles: `total` frames
    /// at `frame_rate`, at most `chunk_cap` frames per fetch, recording
    /// every seek
    struct TestSource {
        total: usize,
        cursor: usize,
        chunk_cap: usize,
        seeks: Arc<Mutex<Vec<Duration>>>,
        frame_rate: u32,
    }

    impl TestSource {
        fn new(total: usize, chunk_cap: usize, frame_rate: u32) -> (Self, Arc<Mutex<Vec<Duration>>>) {
            let seeks = Arc::new(Mutex::new(Vec::new()));
            (
                Self {
                    total,
                    cursor: 0,
                    chunk_cap,
                    seeks: seeks.clone(),
                    frame_rate,
                },
                seeks,
            )
        }
    }

    impl FrameSource for TestSource {
        fn fetch(&mut self, requested: usize) -> FrameChunk {
            let n = requested.min(self.chunk_cap).min(self.total - self.cursor);
            self.cursor += n;
            let frames = (0..n)
                .map(|_| Frame::from_rgba(vec![0u8; 4], 1, 1))
                .collect();
            FrameChunk::frames(frames, self.cursor >= self.total)
        }

        fn seek(&mut self, offset: Duration) {
            self.seeks.lock().unwrap().push(offset);
            let frame = frame_index(offset, self.frame_rate) as usize;
            self.cursor = frame.min(self.total);
        }
    }

    fn engine_with(
        total: usize,
        chunk_cap: usize,
        frame_rate: u32,
    ) -> (StreamEngine, Arc<Mutex<Vec<Duration>>>) {
        let (source, seeks) = TestSource::new(total, chunk_cap, frame_rate);
        let info = StreamInfo {
            width: 1,
            height: 1,
            frame_rate,
            frame_count: total as u64,
        };
        (StreamEngine::new(info, Box::new(source)), seeks)
    }

    /// Poll `cond` every few ms for up to `timeout`
    fn wait_for(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
        let deadline = std::time::Instant::now() + timeout;
        while std::time::Instant::now() < deadline {
            if cond() {
                return true;
            }
            sleep(Duration::from_millis(5));
        }
        cond()
    }

    /// Test: pause on Stopped and Paused is a no-op
    /// Validates: State and accumulated offset unchanged
    #[test]
    fn test_pause_noop_when_not_playing() {
        let (mut engine, _) = engine_with(100, usize::MAX, 25);

        engine.pause().unwrap();
        assert_eq!(engine.status(), Status::Stopped);
        assert_eq!(engine.playing_offset(), Duration::ZERO);

        engine.play().unwrap();
        engine.pause().unwrap();
        let offset = engine.playing_offset();
        engine.pause().unwrap();
        assert_eq!(engine.status(), Status::Paused);
        assert_eq!(engine.playing_offset(), offset);
    }

    /// Test: play from Stopped rewinds
    /// Validates: frames_processed reset to 0, source seeked to offset 0,
    /// and status reports Playing immediately with no Stopped flicker
    #[test]
    fn test_play_from_stopped_rewinds() {
        let (mut engine, seeks) = engine_with(1000, usize::MAX, 25);

        engine.play().unwrap();
        assert_eq!(engine.status(), Status::Playing);
        assert_eq!(engine.frames_processed(), 0);
        assert_eq!(seeks.lock().unwrap().as_slice(), &[Duration::ZERO]);

        engine.stop().unwrap();
    }

    /// Test: seek primes position before any worker iteration
    /// Validates: 5 s into a 10 s, 24 fps source gives frames_processed 120
    /// and an immediate playing offset of at least 5 s
    #[test]
    fn test_set_playing_offset() {
        let (mut engine, seeks) = engine_with(240, usize::MAX, 24);

        engine.set_playing_offset(Duration::from_secs(5)).unwrap();

        assert_eq!(engine.frames_processed(), 120);
        let offset = engine.playing_offset();
        assert!(offset >= Duration::from_secs(5));
        assert!(offset < Duration::from_millis(5500));
        assert!(seeks.lock().unwrap().contains(&Duration::from_secs(5)));

        engine.stop().unwrap();
    }

    /// Test: non-looping playback runs to completion and restarts cleanly
    /// Validates: Stopped is reached, consumed frame accounting equals the
    /// source total exactly, and a later play() starts again from frame 0
    #[test]
    fn test_plays_to_completion_and_restarts() {
        // 3 batches of 10 frames at 50 fps: 0.6 s of media.
        let (mut engine, seeks) = engine_with(30, 10, 50);

        engine.play().unwrap();
        assert!(wait_for(Duration::from_secs(3), || {
            engine.status() == Status::Stopped
        }));
        assert_eq!(engine.frames_processed(), 30);

        engine.play().unwrap();
        assert_eq!(engine.status(), Status::Playing);
        assert_eq!(engine.frames_processed(), 0);
        // One rewind per play-from-Stopped.
        assert_eq!(
            seeks.lock().unwrap().iter().filter(|s| **s == Duration::ZERO).count(),
            2
        );
        engine.stop().unwrap();
    }

    /// Test: looping keeps playing past the source end
    /// Validates: Status stays Playing beyond one full pass and the
    /// frames-processed counter resets instead of growing without bound
    #[test]
    fn test_looping_resets_counter() {
        // 20 frames at 50 fps: one pass is 0.4 s.
        let (mut engine, _) = engine_with(20, usize::MAX, 50);
        engine.set_looping(true);
        assert!(engine.is_looping());

        engine.play().unwrap();
        sleep(Duration::from_millis(900));
        assert_eq!(engine.status(), Status::Playing);
        // More than two passes have elapsed; an unbounded counter would
        // exceed the per-pass total by now.
        assert!(engine.frames_processed() <= 20 + 20);

        engine.stop().unwrap();
        assert_eq!(engine.status(), Status::Stopped);
    }

    /// Test: pause banks the offset, resume continues it
    /// Validates: Offset frozen across the pause, advancing again after play
    #[test]
    fn test_pause_resume_offset() {
        let (mut engine, seeks) = engine_with(10_000, usize::MAX, 50);

        engine.play().unwrap();
        sleep(Duration::from_millis(120));
        engine.pause().unwrap();

        let paused_at = engine.playing_offset();
        assert!(paused_at >= Duration::from_millis(100));
        sleep(Duration::from_millis(80));
        assert_eq!(engine.playing_offset(), paused_at);

        let seeks_before_resume = seeks.lock().unwrap().len();
        engine.play().unwrap();
        sleep(Duration::from_millis(60));
        assert!(engine.playing_offset() > paused_at);
        // Resume must not reseek.
        assert_eq!(seeks.lock().unwrap().len(), seeks_before_resume);

        engine.stop().unwrap();
        assert_eq!(engine.playing_offset(), Duration::ZERO);
    }

    /// Test: the published frame is polled, never pushed
    /// Validates: current_frame turns Some after play and None after stop
    #[test]
    fn test_current_frame_lifecycle() {
        let (mut engine, _) = engine_with(1000, usize::MAX, 25);
        assert!(engine.current_frame().is_none());

        engine.play().unwrap();
        assert!(wait_for(Duration::from_secs(1), || {
            engine.current_frame().is_some()
        }));

        engine.stop().unwrap();
        assert!(engine.current_frame().is_none());
    }

    /// Test: ring underrun is observable, not an error
    /// Validates: pending can reach 0 while status stays Playing
    #[test]
    fn test_underrun_tolerated() {
        // Source holds 2 tiny batches then nothing more until the end:
        // chunk_cap 5 at 50 fps means 0.1 s per batch, so the ring drains
        // well before a second of playback.
        let (mut engine, _) = engine_with(10, 5, 50);

        engine.play().unwrap();
        // Playback completes quickly; on the way it must pass through a
        // state with no pending buffers while still Playing, or go straight
        // to Stopped - either way nothing errors.
        let saw_underrun = wait_for(Duration::from_secs(2), || {
            engine.status() != Status::Playing
                || (engine.pending_buffer_count() == 0 && engine.status() == Status::Playing)
        });
        assert!(saw_underrun);
        engine.stop().unwrap();
    }
}
