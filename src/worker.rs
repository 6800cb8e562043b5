//! Background streaming worker: refills the ring and advances playback
//!
//! **Why**: The decoder may block for an unbounded time, so all `fetch`/
//! loop-restart `seek` calls happen on a dedicated thread. That thread is
//! the single owner of every piece of mutable ring state while it runs:
//! the controller hands it the whole `StreamCore` at spawn and gets it back
//! through `join`. Nothing mutable is shared - the controller only reads the
//! small published observer block.
//!
//! **Used by**: `StreamEngine` (spawn on play, join on pause/stop)
//!
//! # Loop shape
//!
//! Each tick: advance playback by wall clock (slot hand-over, underrun
//! hold, natural completion), drain `used` updating the frames-processed
//! counter and refilling each drained slot, then park on the stop channel
//! with a 10 ms timeout. Cancellation is cooperative; a decode stall inside
//! a refill delays shutdown by that stall - the stop latency bound is one
//! tick plus the longest observed decode.

use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};
use log::{debug, info, trace, warn};

use crate::clock::frame_index;
use crate::engine::Status;
use crate::error::StreamError;
use crate::frame::Frame;
use crate::ring::BufferRing;
use crate::source::FrameSource;

/// Worker tick; bounds CPU usage and the no-decode part of stop latency
pub(crate) const TICK: Duration = Duration::from_millis(10);

/// Observer block published by the worker, polled by the controller.
///
/// Every field has exactly one writer at any moment: the worker while it
/// runs, the controller only after a join.
#[derive(Debug)]
pub(crate) struct SharedState {
    status: AtomicU8,
    pub frames_processed: AtomicU64,
    pub pending_buffers: AtomicUsize,
    pub used_buffers: AtomicUsize,
    current_frame: Mutex<Option<Frame>>,
}

impl SharedState {
    pub fn new() -> Self {
        Self {
            status: AtomicU8::new(Status::Stopped.to_u8()),
            frames_processed: AtomicU64::new(0),
            pending_buffers: AtomicUsize::new(0),
            used_buffers: AtomicUsize::new(0),
            current_frame: Mutex::new(None),
        }
    }

    pub fn status(&self) -> Status {
        Status::from_u8(self.status.load(Ordering::Acquire))
    }

    pub fn set_status(&self, status: Status) {
        self.status.store(status.to_u8(), Ordering::Release);
    }

    pub fn current_frame(&self) -> Option<Frame> {
        self.current_frame.lock().unwrap().clone()
    }

    pub fn publish_frame(&self, frame: Frame) {
        *self.current_frame.lock().unwrap() = Some(frame);
    }

    pub fn clear_frame(&self) {
        *self.current_frame.lock().unwrap() = None;
    }
}

/// Worker-side playback cursor (the "player" half of the loop)
#[derive(Debug)]
pub(crate) struct PlayerState {
    /// Slot currently being played, if any
    pub current: Option<usize>,
    /// Time already consumed within the current slot's batch
    pub time_buffer: Duration,
    /// Wall-clock anchor for the current slot
    pub anchor: Instant,
    /// False once playback has drained everything it will ever get
    pub playing: bool,
}

impl PlayerState {
    pub fn new() -> Self {
        Self {
            current: None,
            time_buffer: Duration::ZERO,
            anchor: Instant::now(),
            playing: false,
        }
    }

    pub fn reset(&mut self) {
        self.current = None;
        self.time_buffer = Duration::ZERO;
        self.anchor = Instant::now();
        self.playing = false;
    }
}

/// Everything the worker owns while running, handed back on join
pub(crate) struct StreamCore {
    pub ring: BufferRing,
    pub source: Box<dyn FrameSource>,
    pub player: PlayerState,
    /// Latched once the source reports exhaustion; already-pending data
    /// keeps draining after the latch
    pub stop_requested: bool,
}

impl StreamCore {
    pub fn new(ring: BufferRing, source: Box<dyn FrameSource>) -> Self {
        Self {
            ring,
            source,
            player: PlayerState::new(),
            stop_requested: false,
        }
    }
}

/// How the worker should enter its loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Launch {
    /// New session: clear end markers, pre-fill the whole ring
    Fresh,
    /// Continue a paused session: ring state already reflects position
    Resume,
}

/// Handle to a running worker
pub(crate) struct WorkerHandle {
    handle: JoinHandle<StreamCore>,
    stop_tx: Sender<()>,
}

impl WorkerHandle {
    /// True once the worker loop has returned (natural completion)
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Signal the worker to stop and wait for it, recovering the core
    pub fn stop_and_join(self) -> Result<StreamCore, StreamError> {
        let _ = self.stop_tx.send(());
        self.handle.join().map_err(|_| {
            warn!("Stream worker panicked");
            StreamError::WorkerJoin
        })
    }
}

/// Spawn the worker thread, transferring ownership of `core` into it
pub(crate) fn spawn(
    core: StreamCore,
    shared: Arc<SharedState>,
    looping: Arc<AtomicBool>,
    mode: Launch,
) -> Result<WorkerHandle, StreamError> {
    let (stop_tx, stop_rx) = bounded::<()>(1);
    let handle = thread::Builder::new()
        .name("reel-stream".to_string())
        .spawn(move || run(core, shared, stop_rx, looping, mode))
        .map_err(StreamError::ThreadSpawn)?;
    Ok(WorkerHandle { handle, stop_tx })
}

fn run(
    mut core: StreamCore,
    shared: Arc<SharedState>,
    stop_rx: Receiver<()>,
    looping: Arc<AtomicBool>,
    mode: Launch,
) -> StreamCore {
    trace!("Stream worker started ({:?})", mode);

    match mode {
        Launch::Fresh => {
            core.ring.clear_end_markers();
            core.stop_requested = core
                .ring
                .fill_queue(&mut *core.source, looping.load(Ordering::Relaxed));
            core.player.current = core.ring.pop_pending();
            core.player.time_buffer = Duration::ZERO;
        }
        Launch::Resume => {
            if core.player.current.is_none() {
                core.player.current = core.ring.pop_pending();
            }
        }
    }
    core.player.playing = core.player.current.is_some();
    core.player.anchor = Instant::now();
    publish_counts(&core, &shared);

    loop {
        advance_playback(&mut core, &shared);

        if playback_complete(&core) {
            // Account the final drained batches before reporting done.
            drain_used(&mut core, &shared, &looping);
            publish_counts(&core, &shared);
            shared.set_status(Status::Stopped);
            info!("Stream worker: playback complete");
            break;
        }

        drain_used(&mut core, &shared, &looping);
        publish_counts(&core, &shared);

        match stop_rx.recv_timeout(TICK) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                trace!("Stream worker: stop signal received");
                if core.player.playing {
                    // Bank consumed time so a resume continues from here.
                    core.player.time_buffer += core.player.anchor.elapsed();
                }
                break;
            }
        }
    }

    trace!("Stream worker exiting");
    core
}

/// All decoded data played out and no more will ever arrive
fn playback_complete(core: &StreamCore) -> bool {
    !core.player.playing
        && core.stop_requested
        && core.player.current.is_none()
        && core.ring.pending_len() == 0
}

/// Move the playhead along the wall clock: slot hand-overs, underrun hold,
/// natural completion, and publication of the frame for the current offset
fn advance_playback(core: &mut StreamCore, shared: &SharedState) {
    if !core.player.playing {
        return;
    }
    let Some(mut slot) = core.player.current else {
        core.player.playing = false;
        return;
    };
    let mut offset = core.player.time_buffer + core.player.anchor.elapsed();

    loop {
        let duration = core.ring.slot(slot).duration();
        if !duration.is_zero() && offset < duration {
            break;
        }
        // Current batch has played out; hand the slot over.
        match core.ring.pop_pending() {
            Some(next) => {
                core.ring.push_used(slot);
                slot = next;
                offset = offset.saturating_sub(duration);
                core.player.time_buffer = offset;
                core.player.anchor = Instant::now();
                trace!("Playback moved to slot {}", slot);
            }
            None if core.stop_requested => {
                // Fully drained: retire the final batch and rest.
                core.ring.push_used(slot);
                core.player.current = None;
                core.player.playing = false;
                core.player.time_buffer = Duration::ZERO;
                return;
            }
            None => {
                // Underrun: hold the last decoded frame and let the refill
                // side catch up. Wall time keeps running, so frames are
                // skipped once data arrives.
                let buffer = core.ring.slot(slot);
                if !buffer.is_empty() {
                    shared.publish_frame(buffer.frame(buffer.frame_count() - 1).clone());
                }
                core.player.current = Some(slot);
                trace!("Playback underrun on slot {}", slot);
                return;
            }
        }
    }

    core.player.current = Some(slot);
    let buffer = core.ring.slot(slot);
    let index = (frame_index(offset, buffer.frame_rate()) as usize).min(buffer.frame_count() - 1);
    shared.publish_frame(buffer.frame(index).clone());
}

/// Retire fully played slots: update the frames-processed counter and
/// refill each drained slot unless the source is already exhausted
fn drain_used(core: &mut StreamCore, shared: &SharedState, looping: &AtomicBool) {
    while let Some(slot) = core.ring.pop_used() {
        if core.ring.end_marker(slot) {
            shared.frames_processed.store(0, Ordering::Relaxed);
            core.ring.clear_end_marker(slot);
            debug!("Slot {}: loop boundary consumed, frame counter reset", slot);
        } else {
            let count = core.ring.slot(slot).frame_count() as u64;
            shared.frames_processed.fetch_add(count, Ordering::Relaxed);
        }

        if !core.stop_requested
            && core
                .ring
                .fill_slot(slot, &mut *core.source, looping.load(Ordering::Relaxed))
        {
            core.stop_requested = true;
        }
    }
}

fn publish_counts(core: &StreamCore, shared: &SharedState) {
    shared
        .pending_buffers
        .store(core.ring.pending_len(), Ordering::Relaxed);
    shared
        .used_buffers
        .store(core.ring.used_len(), Ordering::Relaxed);
}
