//! Local interaction gestures.
//!
//! DESIGN
//! ======
//! A gesture is the span between pointer-down (or focus) and its commit
//! boundary: pointer release for drag/resize/draw, focus loss for text. Only
//! one gesture is live at a time. While it runs, edits land in the board's
//! shadow layer; the commit emits a single request frame.

#[cfg(test)]
#[path = "gesture_test.rs"]
mod gesture_test;

use frames::Stroke;

#[derive(Clone, Debug, Default, PartialEq)]
pub enum Gesture {
    #[default]
    Idle,
    /// Moving an element. The shadow copy carries the live position.
    Dragging { element_id: String },
    /// Changing an element's size. The shadow copy carries the live size.
    Resizing { element_id: String },
    /// Editing the body of a `text` or `sticky` element.
    EditingText { element_id: String },
    /// A freehand stroke being drawn. Never visible to peers until commit.
    Drawing { stroke: Stroke },
}

impl Gesture {
    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Element the gesture operates on, if any.
    #[must_use]
    pub fn element_id(&self) -> Option<&str> {
        match self {
            Self::Dragging { element_id } | Self::Resizing { element_id } | Self::EditingText { element_id } => {
                Some(element_id)
            }
            Self::Idle | Self::Drawing { .. } => None,
        }
    }

    /// In-progress stroke, if drawing.
    #[must_use]
    pub fn stroke(&self) -> Option<&Stroke> {
        match self {
            Self::Drawing { stroke } => Some(stroke),
            _ => None,
        }
    }
}
