//! Client-side half of the whiteboard sync engine.
//!
//! SYSTEM CONTEXT
//! ==============
//! A host application owns the websocket and the rendering surface. This
//! crate owns everything between them: the local cache of the joined
//! session (`state`), the request frames the cache emits (`net`), and the
//! pure helpers for cursor sampling, SVG export, and the device-local
//! snapshot cache (`util`).

pub mod net;
pub mod state;
pub mod util;
