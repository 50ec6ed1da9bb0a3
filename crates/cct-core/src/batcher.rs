//! Adaptive output batching.
//!
//! PTY output arrives as many small chunks per second. Forwarding each one
//! individually floods the presentation layer during bulk output, while a
//! fixed long interval adds latency to keystroke echo. The batcher coalesces
//! chunks into timed flushes and tunes the flush interval from observed
//! throughput: double it after a heavy flush, snap back to the floor once
//! output quiets down.
//!
//! The batcher itself is a pure state machine; the per-session pump thread in
//! [`crate::session::multiplexer`] supplies the clock by arming a deadline
//! `interval()` after the first chunk of a burst.

use std::time::Duration;

/// Initial and minimum flush interval.
pub const INTERVAL_FLOOR: Duration = Duration::from_millis(4);

/// Maximum flush interval under sustained heavy output.
pub const INTERVAL_CEILING: Duration = Duration::from_millis(32);

/// Bytes per flush above which the interval doubles.
const HIGH_WATER: usize = 32 * 1024;

/// Bytes per flush below which the interval resets to the floor.
const LOW_WATER: usize = 1024;

/// Coalesces raw PTY chunks into fewer, larger flushes.
pub struct AdaptiveBatcher {
    buffer: Vec<u8>,
    bytes_since_flush: usize,
    interval: Duration,
}

impl AdaptiveBatcher {
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            bytes_since_flush: 0,
            interval: INTERVAL_FLOOR,
        }
    }

    /// Append one raw chunk to the pending buffer.
    pub fn push(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
        self.bytes_since_flush += chunk.len();
    }

    /// Take the pending buffer (None if empty) and adapt the interval from
    /// the bytes accumulated since the previous flush.
    pub fn flush(&mut self) -> Option<Vec<u8>> {
        let out = if self.buffer.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.buffer))
        };

        if self.bytes_since_flush > HIGH_WATER {
            self.interval = (self.interval * 2).min(INTERVAL_CEILING);
        } else if self.bytes_since_flush < LOW_WATER {
            self.interval = INTERVAL_FLOOR;
        }
        self.bytes_since_flush = 0;

        out
    }

    /// Current flush interval; the caller arms its timer with this when the
    /// first chunk of a burst arrives.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// True when no output is waiting to be flushed.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

impl Default for AdaptiveBatcher {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================
