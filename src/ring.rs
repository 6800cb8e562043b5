//! Prefetch buffer ring: N reusable slots cycled through pending/used FIFOs
//!
//! **Why**: Decoding is bursty and may block; playback must not. The ring
//! keeps a small number of one-second batches decoded ahead of the playhead
//! so the playback side always has data while the worker refills consumed
//! slots in the background.
//!
//! **Used by**: `StreamWorker` (exclusive owner of all mutable ring state
//! while playback runs), `StreamEngine` (clears it between sessions, after
//! the worker has been joined)
//!
//! # Slot lifecycle
//!
//! Each slot index cycles through: being filled -> `pending` (ready to play,
//! in play order) -> in use by the playback side -> `used` (fully played,
//! awaiting refill) -> being filled again. A slot lives in at most one of
//! those places at a time.
//!
//! # End markers
//!
//! `end_marker[i]` records that the fill of slot `i` hit end-of-stream. When
//! looping, that same fill seeks back to 0 and retries exactly once, so the
//! marked slot carries the first frames of the next iteration; consuming it
//! is the signal to reset the frames-processed counter.

use std::collections::VecDeque;
use std::time::Duration;

use log::{debug, warn};

use crate::buffer::MediaBuffer;
use crate::source::FrameSource;

/// Number of reusable buffer slots
pub const RING_SLOTS: usize = 3;

/// Fixed ring of prefetch buffers plus play-order bookkeeping
#[derive(Debug)]
pub struct BufferRing {
    slots: Vec<MediaBuffer>,
    pending: VecDeque<usize>,
    used: VecDeque<usize>,
    end_marker: [bool; RING_SLOTS],
    frame_rate: u32,
}

impl BufferRing {
    /// Ring with `RING_SLOTS` empty slots, allocated once for the engine's
    /// lifetime
    pub fn new(frame_rate: u32) -> Self {
        Self {
            slots: (0..RING_SLOTS).map(|_| MediaBuffer::new()).collect(),
            pending: VecDeque::with_capacity(RING_SLOTS),
            used: VecDeque::with_capacity(RING_SLOTS),
            end_marker: [false; RING_SLOTS],
            frame_rate,
        }
    }

    /// One second of frames per fetch
    fn frames_per_fetch(&self) -> usize {
        (self.frame_rate as usize).max(1)
    }

    /// Refill slot `slot` from the source
    ///
    /// Returns `true` when the source is exhausted and playback should wind
    /// down ("stop requested"): the slot is then left unqueued. An empty
    /// end-of-stream fetch marks the slot; with looping enabled the source
    /// is seeked back to 0 and fetched exactly once more - a source that
    /// yields nothing twice in a row stops the stream instead of spinning.
    pub fn fill_slot(
        &mut self,
        slot: usize,
        source: &mut dyn FrameSource,
        looping: bool,
    ) -> bool {
        let requested = self.frames_per_fetch();
        let mut chunk = source.fetch(requested);

        if chunk.frames.is_empty() && chunk.reached_end {
            self.end_marker[slot] = true;
            if !looping {
                debug!("Slot {}: end of stream, not looping", slot);
                return true;
            }
            source.seek(Duration::ZERO);
            chunk = source.fetch(requested);
            if chunk.frames.is_empty() {
                warn!("Slot {}: source empty after loop restart, stopping", slot);
                return true;
            }
            debug!(
                "Slot {}: loop restart, {} frame(s) from offset 0",
                slot,
                chunk.frames.len()
            );
        }

        if chunk.frames.is_empty() {
            // Not at end yet zero frames decoded: nothing can be queued,
            // treat like an exhausted source rather than spinning on it.
            warn!("Slot {}: empty fetch without end-of-stream, stopping", slot);
            return true;
        }

        let count = chunk.frames.len();
        self.slots[slot].load(chunk.frames, self.frame_rate);
        self.pending.push_back(slot);
        debug!("Slot {}: filled with {} frame(s)", slot, count);
        false
    }

    /// Pre-fill every slot in order, short-circuiting once the source
    /// reports exhaustion; propagates that result
    pub fn fill_queue(&mut self, source: &mut dyn FrameSource, looping: bool) -> bool {
        for slot in 0..RING_SLOTS {
            if self.fill_slot(slot, source, looping) {
                return true;
            }
        }
        false
    }

    /// Oldest slot ready to play, if any
    pub fn pop_pending(&mut self) -> Option<usize> {
        self.pending.pop_front()
    }

    /// Oldest fully played slot awaiting refill, if any
    pub fn pop_used(&mut self) -> Option<usize> {
        self.used.pop_front()
    }

    /// Hand a fully played slot back for refill
    pub fn push_used(&mut self, slot: usize) {
        self.used.push_back(slot);
    }

    /// Slots currently ready to play
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Slots currently awaiting refill
    pub fn used_len(&self) -> usize {
        self.used.len()
    }

    /// Buffer backing slot `slot`
    pub fn slot(&self, slot: usize) -> &MediaBuffer {
        &self.slots[slot]
    }

    /// End marker for slot `slot`
    pub fn end_marker(&self, slot: usize) -> bool {
        self.end_marker[slot]
    }

    /// Clear one slot's end marker, after its reset has been applied
    pub fn clear_end_marker(&mut self, slot: usize) {
        self.end_marker[slot] = false;
    }

    /// Clear every end marker (fresh playback entry)
    pub fn clear_end_markers(&mut self) {
        self.end_marker = [false; RING_SLOTS];
    }

    /// Drop all queue state and slot contents
    ///
    /// Slot allocations are kept for reuse by the next playback session.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.used.clear();
        self.end_marker = [false; RING_SLOTS];
        for slot in &mut self.slots {
            slot.clear();
        }
    }
}
