//! Server configuration parsed from environment variables.
//!
//! A `.env` file is loaded first when present; real environment variables
//! win. Unparseable values fall back to defaults rather than aborting startup.

use std::time::Duration;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_CLIENT_QUEUE_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    /// Bounded outbound queue per connection. A peer that fills it is evicted.
    pub client_queue_capacity: usize,
    /// Minimum spacing between relayed cursor frames from one connection.
    pub cursor_min_interval: Duration,
}

impl ServerConfig {
    /// Build typed config from environment variables.
    ///
    /// Optional:
    /// - `PORT`: default 3000
    /// - `CLIENT_QUEUE_CAPACITY`: default 256 (minimum 1)
    /// - `CURSOR_MIN_INTERVAL_MS`: default 40
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            port: env_parse("PORT", DEFAULT_PORT),
            client_queue_capacity: env_parse("CLIENT_QUEUE_CAPACITY", DEFAULT_CLIENT_QUEUE_CAPACITY).max(1),
            cursor_min_interval: Duration::from_millis(env_parse(
                "CURSOR_MIN_INTERVAL_MS",
                frames::consts::CURSOR_MIN_INTERVAL_MS,
            )),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            client_queue_capacity: DEFAULT_CLIENT_QUEUE_CAPACITY,
            cursor_min_interval: Duration::from_millis(frames::consts::CURSOR_MIN_INTERVAL_MS),
        }
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
