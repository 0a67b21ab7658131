//! Event names carried in `Frame::syscall`.
//!
//! Requests are imperative (`element:add`); the matching broadcast delivered
//! to other members is past tense (`element:added`).

// ── Client → registry/store ─────────────────────────────────────

pub const JOIN: &str = "join";
pub const LEAVE: &str = "leave";
pub const ELEMENT_ADD: &str = "element:add";
pub const ELEMENT_UPDATE: &str = "element:update";
pub const ELEMENT_DELETE: &str = "element:delete";
pub const STROKE_ADD: &str = "stroke:add";
pub const CLEAR: &str = "clear";
pub const PERMISSION_SET: &str = "permission:set";
pub const CURSOR: &str = "cursor";

// ── Store → members ─────────────────────────────────────────────

/// Sent once per connection right after the websocket upgrade.
pub const SESSION_CONNECTED: &str = "session:connected";
pub const ELEMENT_ADDED: &str = "element:added";
pub const ELEMENT_UPDATED: &str = "element:updated";
pub const ELEMENT_DELETED: &str = "element:deleted";
pub const STROKE_ADDED: &str = "stroke:added";
pub const CLEARED: &str = "cleared";
pub const PERMISSIONS: &str = "permissions";
pub const PRESENCE: &str = "presence";

/// Transport-level error for frames that could not be decoded at all.
pub const GATEWAY_ERROR: &str = "gateway:error";

// ── Payload keys ────────────────────────────────────────────────

pub const KEY_USER_ID: &str = "user_id";
pub const KEY_DISPLAY_NAME: &str = "display_name";
pub const KEY_ELEMENT: &str = "element";
pub const KEY_ELEMENT_ID: &str = "element_id";
pub const KEY_STROKE: &str = "stroke";
pub const KEY_TARGET_USER_ID: &str = "target_user_id";
pub const KEY_CAN_DRAW: &str = "can_draw";
pub const KEY_PERMISSIONS: &str = "permissions";
pub const KEY_MEMBERS: &str = "members";
pub const KEY_APPLIED: &str = "applied";
pub const KEY_CLIENT_ID: &str = "client_id";
pub const KEY_X: &str = "x";
pub const KEY_Y: &str = "y";
