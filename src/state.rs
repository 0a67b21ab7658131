//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It is
//! cheap to clone: the registry and cursor limiter are shared handles, and
//! the config is plain data read once at startup.

use crate::config::ServerConfig;
use crate::rate_limit::CursorRateLimiter;
use crate::services::registry::Registry;

#[derive(Clone)]
pub struct AppState {
    /// Live whiteboard sessions keyed by channel id.
    pub registry: Registry,
    pub config: ServerConfig,
    /// Server-side cap on relayed cursor frequency per connection.
    pub cursor_limiter: CursorRateLimiter,
}

impl AppState {
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        Self {
            registry: Registry::new(),
            cursor_limiter: CursorRateLimiter::new(config.cursor_min_interval),
            config,
        }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
#[path = "state_helpers_test.rs"]
pub mod test_helpers;
