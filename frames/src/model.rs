//! Whiteboard data model shared by the relay server and clients.
//!
//! DESIGN
//! ======
//! Elements are whole-record values: an update replaces the record keyed by
//! id, so there is no per-field merge anywhere in the system. Strokes are
//! append-only and only ever cleared in bulk.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Draw rights keyed by user id. Absent means allowed.
pub type Permissions = BTreeMap<String, bool>;

// =============================================================================
// ELEMENT
// =============================================================================

/// A placed object on the board.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Element {
    /// Opaque id, unique within a session.
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    #[serde(flatten)]
    pub kind: ElementKind,
}

/// Variant payload, tagged on the wire by `"type"`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ElementKind {
    Text { content: String, color: String },
    Sticky { content: String, color: String },
    Shape { color: String },
    Image { source: String },
}

impl ElementKind {
    /// Wire tag for this variant.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Sticky { .. } => "sticky",
            Self::Shape { .. } => "shape",
            Self::Image { .. } => "image",
        }
    }
}

impl Element {
    /// Text body for `text` and `sticky` elements.
    #[must_use]
    pub fn content(&self) -> Option<&str> {
        match &self.kind {
            ElementKind::Text { content, .. } | ElementKind::Sticky { content, .. } => Some(content),
            ElementKind::Shape { .. } | ElementKind::Image { .. } => None,
        }
    }

    /// Color for every variant except `image`.
    #[must_use]
    pub fn color(&self) -> Option<&str> {
        match &self.kind {
            ElementKind::Text { color, .. } | ElementKind::Sticky { color, .. } | ElementKind::Shape { color } => {
                Some(color)
            }
            ElementKind::Image { .. } => None,
        }
    }

    /// Replace the text body. Returns `false` for variants without text.
    pub fn set_content(&mut self, text: impl Into<String>) -> bool {
        match &mut self.kind {
            ElementKind::Text { content, .. } | ElementKind::Sticky { content, .. } => {
                *content = text.into();
                true
            }
            ElementKind::Shape { .. } | ElementKind::Image { .. } => false,
        }
    }
}

// =============================================================================
// STROKE
// =============================================================================

/// A freehand path. Never mutated after creation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub id: String,
    pub points: Vec<[f64; 2]>,
    pub color: String,
    pub width: f64,
}

// =============================================================================
// PRESENCE
// =============================================================================

/// Wire projection of an active member. Cursor state is deliberately absent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub display_name: String,
    pub color: String,
}

/// Last known pointer position of a member.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cursor {
    pub x: f64,
    pub y: f64,
}

// =============================================================================
// SNAPSHOT
// =============================================================================

/// Full session state handed to a joiner.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub channel_id: String,
    pub creator_id: String,
    /// Elements in z-order (insertion order).
    pub elements: Vec<Element>,
    pub strokes: Vec<Stroke>,
    pub permissions: Permissions,
    pub active_members: BTreeMap<String, Member>,
}

impl SessionSnapshot {
    /// True when the board carries neither elements nor strokes.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.elements.is_empty() && self.strokes.is_empty()
    }
}

#[cfg(test)]
#[path = "model_test.rs"]
mod tests;
