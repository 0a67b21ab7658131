//! Local mutations sent to the session and not yet acknowledged.
//!
//! DESIGN
//! ======
//! Every mutating request gets exactly one reply. Until it lands, the change
//! lives here, keyed by request id, and is drawn on top of the confirmed
//! layer. `applied: true` folds it into the confirmed layer; `applied: false`
//! or an error reply drops it. Replies follow every relayed frame committed
//! before them, so folding on reply keeps the confirmed layer in commit
//! order.

#[cfg(test)]
#[path = "pending_test.rs"]
mod pending_test;

use frames::{Element, Stroke};

/// One board change, as requested or as confirmed.
#[derive(Clone, Debug, PartialEq)]
pub enum Change {
    AddElement(Element),
    /// Full replacement record.
    UpdateElement(Element),
    DeleteElement(String),
    AddStroke(Stroke),
    Clear,
}

impl Change {
    /// Apply the change to a board layer. Last write wins per element id.
    pub fn apply(&self, elements: &mut Vec<Element>, strokes: &mut Vec<Stroke>) {
        match self {
            Self::AddElement(element) => match elements.iter_mut().find(|e| e.id == element.id) {
                Some(existing) => *existing = element.clone(),
                None => elements.push(element.clone()),
            },
            // The session rejects updates to unknown ids.
            Self::UpdateElement(element) => {
                if let Some(existing) = elements.iter_mut().find(|e| e.id == element.id) {
                    *existing = element.clone();
                }
            }
            Self::DeleteElement(element_id) => elements.retain(|e| &e.id != element_id),
            Self::AddStroke(stroke) => {
                if !strokes.iter().any(|s| s.id == stroke.id) {
                    strokes.push(stroke.clone());
                }
            }
            Self::Clear => {
                elements.clear();
                strokes.clear();
            }
        }
    }
}

/// A change awaiting the reply to `request_id`.
#[derive(Clone, Debug, PartialEq)]
pub struct PendingChange {
    pub request_id: String,
    pub change: Change,
}

/// Unacknowledged changes in send order.
#[derive(Clone, Debug, Default)]
pub struct PendingChanges {
    queue: Vec<PendingChange>,
}

impl PendingChanges {
    pub fn push(&mut self, request_id: impl Into<String>, change: Change) {
        self.queue.push(PendingChange { request_id: request_id.into(), change });
    }

    /// Remove and return the change sent as `request_id`.
    pub fn settle(&mut self, request_id: &str) -> Option<Change> {
        let index = self
            .queue
            .iter()
            .position(|p| p.request_id == request_id)?;
        Some(self.queue.remove(index).change)
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Draw every pending change, in send order, onto a copy of a layer.
    #[must_use]
    pub fn project(&self, elements: &[Element], strokes: &[Stroke]) -> (Vec<Element>, Vec<Stroke>) {
        let mut elements = elements.to_vec();
        let mut strokes = strokes.to_vec();
        for pending in &self.queue {
            pending.change.apply(&mut elements, &mut strokes);
        }
        (elements, strokes)
    }
}
