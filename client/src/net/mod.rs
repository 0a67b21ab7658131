//! Wire-facing helpers.
//!
//! SYSTEM CONTEXT
//! ==============
//! `requests` builds every client→session request frame. Frames are the
//! shared `frames::Frame` type so the host can encode them with
//! `frames::encode_frame` or serde as its transport requires.

pub mod requests;

pub use frames::Frame;
pub use frames::Status as FrameStatus;
