//! Pointer sampling throttle for cursor presence.
//!
//! DESIGN
//! ======
//! The first sample after a quiet interval is emitted immediately (leading
//! edge). Samples inside the interval only replace the pending position; the
//! host calls `flush` on a timer so the resting position still goes out once
//! the interval has elapsed (trailing edge).

#[cfg(test)]
#[path = "cursor_throttle_test.rs"]
mod cursor_throttle_test;

use std::time::{Duration, Instant};

use frames::Cursor;
use frames::consts::CURSOR_MIN_INTERVAL_MS;

#[derive(Clone, Debug)]
pub struct CursorThrottle {
    min_interval: Duration,
    last_emit: Option<Instant>,
    pending: Option<Cursor>,
}

impl Default for CursorThrottle {
    fn default() -> Self {
        Self::new(Duration::from_millis(CURSOR_MIN_INTERVAL_MS))
    }
}

impl CursorThrottle {
    #[must_use]
    pub fn new(min_interval: Duration) -> Self {
        Self { min_interval, last_emit: None, pending: None }
    }

    /// Offer a sampled position. Returns it if it may be sent now.
    pub fn sample(&mut self, position: Cursor) -> Option<Cursor> {
        self.sample_at(Instant::now(), position)
    }

    pub fn sample_at(&mut self, now: Instant, position: Cursor) -> Option<Cursor> {
        if self.ready_at(now) {
            self.last_emit = Some(now);
            self.pending = None;
            return Some(position);
        }
        self.pending = Some(position);
        None
    }

    /// Release the suppressed position once the interval has passed.
    pub fn flush(&mut self) -> Option<Cursor> {
        self.flush_at(Instant::now())
    }

    pub fn flush_at(&mut self, now: Instant) -> Option<Cursor> {
        if self.pending.is_none() || !self.ready_at(now) {
            return None;
        }
        self.last_emit = Some(now);
        self.pending.take()
    }

    /// Time until a pending position can be flushed; `None` when nothing waits.
    #[must_use]
    pub fn next_flush_in_at(&self, now: Instant) -> Option<Duration> {
        self.pending?;
        let Some(last) = self.last_emit else {
            return Some(Duration::ZERO);
        };
        Some(self.min_interval.saturating_sub(now.saturating_duration_since(last)))
    }

    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Forget timing and the pending sample, e.g. after leaving a channel.
    pub fn reset(&mut self) {
        self.last_emit = None;
        self.pending = None;
    }

    fn ready_at(&self, now: Instant) -> bool {
        self.last_emit
            .is_none_or(|last| now.saturating_duration_since(last) >= self.min_interval)
    }
}
