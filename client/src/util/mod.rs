//! Utility helpers shared by board clients.
//!
//! SYSTEM CONTEXT
//! ==============
//! These modules hold the pieces that sit beside the board reducer but do not
//! depend on it: input throttling, vector export, and device-local snapshot
//! storage.

pub mod cursor_throttle;
pub mod export;
pub mod snapshot;
