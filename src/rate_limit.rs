//! In-memory rate limiting for cursor relays.
//!
//! DESIGN
//! ======
//! Clients already throttle pointer samples before sending them. This gate
//! enforces the same bound server-side so a client that does not throttle
//! cannot flood every peer's queue: per connection, a cursor frame is relayed
//! only if at least `min_interval` has passed since the last relayed one.
//! A refused sample reports how long until the window reopens; the caller
//! holds only the latest one until then.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use uuid::Uuid;

// =============================================================================
// ERROR TYPE
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    #[error("cursor rate exceeded (retry in {}ms)", retry_in.as_millis())]
    CursorTooFrequent { retry_in: Duration },
}

// =============================================================================
// RATE LIMITER
// =============================================================================

#[derive(Clone)]
pub struct CursorRateLimiter {
    inner: Arc<Mutex<HashMap<Uuid, Instant>>>,
    min_interval: Duration,
}

impl CursorRateLimiter {
    #[must_use]
    pub fn new(min_interval: Duration) -> Self {
        Self { inner: Arc::new(Mutex::new(HashMap::new())), min_interval }
    }

    /// Check the connection's cursor budget and record the relay if allowed.
    ///
    /// # Errors
    ///
    /// `CursorTooFrequent` with the time left in the current window.
    pub fn check_and_record(&self, client_id: Uuid) -> Result<(), RateLimitError> {
        self.check_and_record_at(client_id, Instant::now())
    }

    /// Internal: check + record with explicit timestamp (for testing).
    fn check_and_record_at(&self, client_id: Uuid, now: Instant) -> Result<(), RateLimitError> {
        let mut last_relayed = self
            .inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        if let Some(&last) = last_relayed.get(&client_id) {
            let elapsed = now.saturating_duration_since(last);
            if elapsed < self.min_interval {
                return Err(RateLimitError::CursorTooFrequent { retry_in: self.min_interval - elapsed });
            }
        }

        last_relayed.insert(client_id, now);
        Ok(())
    }

    /// Drop tracking for a closed connection.
    pub fn forget(&self, client_id: Uuid) {
        let mut last_relayed = self
            .inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        last_relayed.remove(&client_id);
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }
}

impl Default for CursorRateLimiter {
    fn default() -> Self {
        Self::new(Duration::from_millis(frames::consts::CURSOR_MIN_INTERVAL_MS))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[path = "rate_limit_test.rs"]
mod tests;
