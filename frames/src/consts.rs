//! Process-wide constants shared by the relay server and clients.

// ── Presence ────────────────────────────────────────────────────

/// Display colors handed out to joining members, in allocation order.
pub const PRESENCE_PALETTE: [&str; 12] = [
    "#e5484d", "#f76b15", "#ffc53d", "#46a758", "#12a594", "#0090ff",
    "#3e63dd", "#8e4ec6", "#d6409f", "#ad7f58", "#5b5bd6", "#868e96",
];

// ── Canvas ──────────────────────────────────────────────────────

/// Logical canvas width in board units.
pub const CANVAS_WIDTH: f64 = 1920.0;

/// Logical canvas height in board units.
pub const CANVAS_HEIGHT: f64 = 1080.0;

// ── Cursor ──────────────────────────────────────────────────────

/// Minimum spacing between relayed cursor updates (25 per second).
pub const CURSOR_MIN_INTERVAL_MS: u64 = 40;

// ── Transport ───────────────────────────────────────────────────

/// Largest encoded frame either end accepts, in bytes.
pub const MAX_FRAME_BYTES: usize = 1024 * 1024;
