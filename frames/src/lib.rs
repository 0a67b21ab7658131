//! Wire model shared by the whiteboard relay server and its clients.
//!
//! Everything both ends must agree on lives here: the [`Frame`] envelope and
//! its protobuf codec ([`codec`]), the board data model ([`model`]), event
//! names and payload keys ([`events`]), and process-wide constants
//! ([`consts`]). Payloads stay schemaless `serde_json::Value` inside the
//! envelope; typed decoding happens at the edges.

pub mod codec;
pub mod consts;
pub mod events;
pub mod model;

pub use codec::{CodecError, decode_frame, encode_frame};
pub use model::{Cursor, Element, ElementKind, Member, Permissions, SessionSnapshot, Stroke};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Position of a frame in a request/reply exchange.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Client request, or a broadcast event relayed to peers.
    Request,
    /// Non-terminal streamed item.
    Item,
    /// Non-terminal streamed batch.
    Bulk,
    /// Terminal success.
    Done,
    /// Terminal failure; data carries `code`, `message`, `retryable`.
    Error,
    Cancel,
}

impl Status {
    /// Done, error, and cancel end an exchange.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Error | Self::Cancel)
    }
}

/// One message on the realtime channel. Serializes as JSON for text
/// websocket messages and through [`codec`] for binary ones.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub id: String,
    /// Request this frame answers, if it is a reply.
    pub parent_id: Option<String>,
    /// Milliseconds since the Unix epoch.
    pub ts: i64,
    /// Whiteboard channel the frame belongs to.
    pub channel_id: Option<String>,
    /// Acting user id on broadcasts.
    pub from: Option<String>,
    /// Event name, e.g. `"element:add"` or `"cursor"`.
    pub syscall: String,
    pub status: Status,
    pub data: Value,
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
