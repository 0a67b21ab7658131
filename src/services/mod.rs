//! Domain services used by the websocket route.
//!
//! ARCHITECTURE
//! ============
//! Service modules own session state and fan-out so the route handler can
//! stay focused on protocol translation.

pub mod palette;
pub mod registry;
pub mod relay;
pub mod session;
