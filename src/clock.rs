//! Wall-clock playing offset: anchor timestamp plus banked time
//!
//! **Why**: Playback position is presentation-clock-driven. While playing,
//! the offset is the banked time plus whatever elapsed since the last
//! anchor; paused, it is just the banked time. The presenter turns the
//! offset into a frame index on every poll - the index is never cached.
//!
//! **Used by**: `StreamEngine` (controller-thread offset reporting), worker
//! playback (per-buffer hand-over timing uses the same arithmetic)

use std::time::{Duration, Instant};

/// Frame index for a playing offset: `floor(offset_secs * frame_rate)`
pub fn frame_index(offset: Duration, frame_rate: u32) -> u64 {
    (offset.as_secs_f64() * frame_rate as f64) as u64
}

/// Playing-offset clock, touched by the controller thread only
#[derive(Debug, Clone)]
pub struct PlaybackClock {
    anchor: Instant,
    accumulated: Duration,
}

impl PlaybackClock {
    pub fn new() -> Self {
        Self {
            anchor: Instant::now(),
            accumulated: Duration::ZERO,
        }
    }

    /// Restart the anchor without touching banked time (play/resume)
    pub fn restart(&mut self) {
        self.anchor = Instant::now();
    }

    /// Bank elapsed wall time into the accumulated offset (pause)
    pub fn bank(&mut self) {
        self.accumulated += self.anchor.elapsed();
    }

    /// Drop the accumulated offset (stop)
    pub fn reset(&mut self) {
        self.accumulated = Duration::ZERO;
        self.anchor = Instant::now();
    }

    /// Prime the clock at an explicit offset (seek)
    pub fn set(&mut self, offset: Duration) {
        self.accumulated = offset;
        self.anchor = Instant::now();
    }

    /// Current playing offset; `running` selects whether wall time since
    /// the anchor counts
    pub fn offset(&self, running: bool) -> Duration {
        if running {
            self.accumulated + self.anchor.elapsed()
        } else {
            self.accumulated
        }
    }
}

impl Default for PlaybackClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Test: Frame index computation
    /// Validates: 1.5 s at 24 fps selects frame 36
    #[test]
    fn test_frame_index() {
        assert_eq!(frame_index(Duration::from_millis(1500), 24), 36);
        assert_eq!(frame_index(Duration::ZERO, 24), 0);
        assert_eq!(frame_index(Duration::from_secs(1), 30), 30);
    }

    /// Test: Paused clock is frozen at the banked offset
    /// Validates: Offset ignores the anchor while not running
    #[test]
    fn test_paused_offset_frozen() {
        let mut clock = PlaybackClock::new();
        clock.set(Duration::from_secs(5));

        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(clock.offset(false), Duration::from_secs(5));
        assert!(clock.offset(true) >= Duration::from_secs(5));
    }

    /// Test: Banking accumulates elapsed time
    /// Validates: pause() adds wall time since the last anchor exactly once
    #[test]
    fn test_bank_accumulates() {
        let mut clock = PlaybackClock::new();
        clock.restart();
        std::thread::sleep(Duration::from_millis(30));
        clock.bank();

        let banked = clock.offset(false);
        assert!(banked >= Duration::from_millis(30));

        // Frozen after banking until the anchor is restarted.
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(clock.offset(false), banked);
    }

    /// Test: Reset zeroes the offset
    /// Validates: stop() semantics
    #[test]
    fn test_reset() {
        let mut clock = PlaybackClock::new();
        clock.set(Duration::from_secs(9));
        clock.reset();
        assert_eq!(clock.offset(false), Duration::ZERO);
    }
}
