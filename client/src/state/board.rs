//! Board-session state for the joined channel.
//!
//! SYSTEM CONTEXT
//! ==============
//! This model stores the local projection of one joined whiteboard session:
//! the confirmed cache the session has told us about, sent mutations still
//! awaiting their reply, unconfirmed shadow edits from the gesture in flight,
//! presence, and remote cursors.
//!
//! DESIGN
//! ======
//! - `join` replaces the whole cache with the snapshot in the join reply.
//! - Incoming events are applied in arrival order, last event wins per id.
//! - The confirmed layer changes only through frames from the session. The
//!   session never echoes a mutation to its originator; instead the
//!   mutation waits in the pending layer until its reply folds it in
//!   (`applied: true`) or drops it (`applied: false`, error).
//! - Render layers stack: confirmed, then pending, then the gesture shadow.
//! - Every local mutation returns the request frame to send, or `None` when
//!   it is inert (not joined, no draw rights, nothing changed).

#[cfg(test)]
#[path = "board_test.rs"]
mod board_test;

use std::collections::{BTreeMap, HashMap};

use frames::events;
use frames::{Cursor, Element, Member, Permissions, SessionSnapshot, Stroke};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::net::{Frame, FrameStatus, requests};
use crate::state::gesture::Gesture;
use crate::state::pending::{Change, PendingChanges};

/// WebSocket connection status.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// Not connected; socket is closed or not yet opened.
    #[default]
    Disconnected,
    /// WebSocket handshake is in progress.
    Connecting,
    /// WebSocket is open and the server sent `session:connected`.
    Connected,
}

#[derive(Clone, Debug, Default)]
pub struct BoardState {
    /// Local user id, as sent in `join`.
    pub self_user_id: String,
    pub self_display_name: String,
    /// Connection id assigned by the server on upgrade.
    pub self_client_id: Option<String>,
    pub connection_status: ConnectionStatus,
    /// Channel of the current or pending join.
    pub channel_id: Option<String>,
    /// Outbound `join` request awaiting its snapshot reply.
    pub pending_join_request_id: Option<String>,
    /// Channel the server dropped this connection from. Join it again.
    pub rejoin_channel: Option<String>,
    creator_id: Option<String>,
    /// Confirmed elements in z-order.
    elements: Vec<Element>,
    strokes: Vec<Stroke>,
    /// Sent mutations awaiting their reply.
    pending: PendingChanges,
    /// Unconfirmed local edits keyed by element id.
    shadow: HashMap<String, Element>,
    permissions: Permissions,
    members: BTreeMap<String, Member>,
    /// Last live cursor per remote user. Never part of any snapshot.
    remote_cursors: HashMap<String, Cursor>,
    gesture: Gesture,
}

impl BoardState {
    #[must_use]
    pub fn new(user_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self { self_user_id: user_id.into(), self_display_name: display_name.into(), ..Self::default() }
    }
}

// =============================================================================
// MEMBERSHIP
// =============================================================================

impl BoardState {
    /// Start joining `channel_id`. The cache is emptied until the reply lands.
    pub fn join(&mut self, channel_id: &str) -> Frame {
        let frame = requests::join(channel_id, &self.self_user_id, &self.self_display_name);
        self.reset_session();
        self.channel_id = Some(channel_id.to_owned());
        self.pending_join_request_id = Some(frame.id.clone());
        self.rejoin_channel = None;
        frame
    }

    /// Leave the current channel. In-flight gesture edits are dropped.
    pub fn leave(&mut self) -> Option<Frame> {
        let channel_id = self.channel_id.take()?;
        self.reset_session();
        Some(requests::leave(&channel_id))
    }

    fn reset_session(&mut self) {
        self.pending_join_request_id = None;
        self.creator_id = None;
        self.elements.clear();
        self.strokes.clear();
        self.pending.clear();
        self.shadow.clear();
        self.permissions.clear();
        self.members.clear();
        self.remote_cursors.clear();
        self.gesture = Gesture::Idle;
    }

    fn load_snapshot(&mut self, snapshot: SessionSnapshot) {
        self.reset_session();
        self.creator_id = Some(snapshot.creator_id);
        self.elements = snapshot.elements;
        self.strokes = snapshot.strokes;
        self.permissions = snapshot.permissions;
        self.members = snapshot.active_members;
    }
}

// =============================================================================
// INCOMING FRAMES
// =============================================================================

impl BoardState {
    /// Apply one frame from the server. Returns true if local state changed.
    pub fn apply_frame(&mut self, frame: &Frame) -> bool {
        match frame.syscall.as_str() {
            events::SESSION_CONNECTED => {
                self.self_client_id = frame
                    .data
                    .get(events::KEY_CLIENT_ID)
                    .and_then(Value::as_str)
                    .map(str::to_owned);
                self.connection_status = ConnectionStatus::Connected;
                true
            }
            events::GATEWAY_ERROR => self.apply_gateway_error(frame),
            events::JOIN => self.apply_join_reply(frame),
            _ if frame.status != FrameStatus::Request => self.apply_reply(frame),
            _ if !self.accepts_session_event(frame) => false,
            events::ELEMENT_ADDED | events::ELEMENT_UPDATED => self.apply_element(frame),
            events::ELEMENT_DELETED => self.apply_element_deleted(frame),
            events::STROKE_ADDED => self.apply_stroke(frame),
            events::CLEARED => {
                self.elements.clear();
                self.strokes.clear();
                self.shadow.clear();
                self.gesture = Gesture::Idle;
                true
            }
            events::PERMISSIONS => self.apply_permissions(frame),
            events::PRESENCE => self.apply_presence(frame),
            events::CURSOR => self.apply_cursor(frame),
            _ => false,
        }
    }

    /// Session events are only meaningful for the channel we have joined.
    fn accepts_session_event(&self, frame: &Frame) -> bool {
        if self.pending_join_request_id.is_some() {
            return false;
        }
        match (&self.channel_id, &frame.channel_id) {
            (Some(joined), Some(channel)) => joined == channel,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }

    fn apply_gateway_error(&mut self, frame: &Frame) -> bool {
        let code = frame
            .data
            .get("code")
            .and_then(Value::as_str)
            .unwrap_or("-");
        log::warn!("gateway error {code}");
        if code != "E_RELAY_LAGGED" {
            return false;
        }
        self.reset_session();
        self.rejoin_channel = self.channel_id.take();
        true
    }

    fn apply_join_reply(&mut self, frame: &Frame) -> bool {
        let Some(pending) = self.pending_join_request_id.as_deref() else {
            return false;
        };
        if frame.parent_id.as_deref() != Some(pending) {
            return false;
        }

        match frame.status {
            FrameStatus::Done => match serde_json::from_value::<SessionSnapshot>(frame.data.clone()) {
                Ok(snapshot) => {
                    self.load_snapshot(snapshot);
                    true
                }
                Err(e) => {
                    log::warn!("undecodable join snapshot: {e}");
                    false
                }
            },
            FrameStatus::Error => {
                log::warn!("join rejected: {}", frame.data);
                self.pending_join_request_id = None;
                self.channel_id = None;
                true
            }
            _ => false,
        }
    }

    /// Settle the pending change a reply answers.
    fn apply_reply(&mut self, frame: &Frame) -> bool {
        let Some(request_id) = frame.parent_id.as_deref() else {
            return false;
        };
        let Some(change) = self.pending.settle(request_id) else {
            return false;
        };

        let applied = frame.status == FrameStatus::Done && frame.data.get(events::KEY_APPLIED) == Some(&Value::Bool(true));
        if applied {
            change.apply(&mut self.elements, &mut self.strokes);
            return true;
        }

        log::debug!("session declined {} {request_id}", frame.syscall);
        // The gesture may target an element that only the dropped change created.
        let orphaned = self
            .gesture
            .element_id()
            .is_some_and(|id| self.projected_element(id).is_none());
        if orphaned {
            self.cancel_gesture();
        }
        true
    }

    fn apply_element(&mut self, frame: &Frame) -> bool {
        let Some(element) = payload::<Element>(frame, events::KEY_ELEMENT) else {
            return false;
        };
        match self.elements.iter_mut().find(|e| e.id == element.id) {
            Some(existing) => *existing = element,
            None => self.elements.push(element),
        }
        true
    }

    fn apply_element_deleted(&mut self, frame: &Frame) -> bool {
        let Some(element_id) = payload::<String>(frame, events::KEY_ELEMENT_ID) else {
            return false;
        };
        if self.gesture.element_id() == Some(element_id.as_str()) {
            log::debug!("element {element_id} deleted under local gesture");
            self.gesture = Gesture::Idle;
        }
        self.shadow.remove(&element_id);
        let before = self.elements.len();
        self.elements.retain(|e| e.id != element_id);
        before != self.elements.len()
    }

    fn apply_stroke(&mut self, frame: &Frame) -> bool {
        let Some(stroke) = payload::<Stroke>(frame, events::KEY_STROKE) else {
            return false;
        };
        if self.strokes.iter().any(|s| s.id == stroke.id) {
            return false;
        }
        self.strokes.push(stroke);
        true
    }

    fn apply_permissions(&mut self, frame: &Frame) -> bool {
        let Some(permissions) = payload::<Permissions>(frame, events::KEY_PERMISSIONS) else {
            return false;
        };
        self.permissions = permissions;
        if !self.can_draw() && !self.gesture.is_idle() {
            log::debug!("draw rights revoked; cancelling gesture");
            self.cancel_gesture();
        }
        true
    }

    fn apply_presence(&mut self, frame: &Frame) -> bool {
        let Some(members) = payload::<BTreeMap<String, Member>>(frame, events::KEY_MEMBERS) else {
            return false;
        };
        self.remote_cursors
            .retain(|user_id, _| members.contains_key(user_id));
        self.members = members;
        true
    }

    fn apply_cursor(&mut self, frame: &Frame) -> bool {
        let (Some(user_id), Some(x), Some(y)) = (
            frame.data.get(events::KEY_USER_ID).and_then(Value::as_str),
            frame.data.get(events::KEY_X).and_then(Value::as_f64),
            frame.data.get(events::KEY_Y).and_then(Value::as_f64),
        ) else {
            return false;
        };
        if user_id == self.self_user_id {
            return false;
        }
        self.remote_cursors
            .insert(user_id.to_owned(), Cursor { x, y });
        true
    }
}

/// Typed payload field; malformed payloads are logged and skipped.
fn payload<T: DeserializeOwned>(frame: &Frame, key: &str) -> Option<T> {
    let value = frame.data.get(key)?;
    match serde_json::from_value(value.clone()) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            log::warn!("undecodable {} payload: {e}", frame.syscall);
            None
        }
    }
}

// =============================================================================
// QUERIES
// =============================================================================

impl BoardState {
    /// Joined and holding a snapshot.
    #[must_use]
    pub fn is_joined(&self) -> bool {
        self.channel_id.is_some() && self.pending_join_request_id.is_none()
    }

    #[must_use]
    pub fn creator_id(&self) -> Option<&str> {
        self.creator_id.as_deref()
    }

    #[must_use]
    pub fn is_creator(&self) -> bool {
        self.is_joined() && self.creator_id.as_deref() == Some(self.self_user_id.as_str())
    }

    /// Local draw rights: creator, or not explicitly revoked.
    #[must_use]
    pub fn can_draw(&self) -> bool {
        self.is_joined() && (self.is_creator() || self.permissions.get(&self.self_user_id) != Some(&false))
    }

    #[must_use]
    pub fn permissions(&self) -> &Permissions {
        &self.permissions
    }

    #[must_use]
    pub fn members(&self) -> &BTreeMap<String, Member> {
        &self.members
    }

    #[must_use]
    pub fn remote_cursors(&self) -> &HashMap<String, Cursor> {
        &self.remote_cursors
    }

    /// Elements as last confirmed by the session, in z-order.
    #[must_use]
    pub fn confirmed_elements(&self) -> &[Element] {
        &self.elements
    }

    /// Strokes as last confirmed by the session.
    #[must_use]
    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    /// Sent mutations still awaiting their reply.
    #[must_use]
    pub fn pending(&self) -> &PendingChanges {
        &self.pending
    }

    #[must_use]
    pub fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    /// Unconfirmed copy of an element, if a gesture is editing it.
    #[must_use]
    pub fn shadow(&self, element_id: &str) -> Option<&Element> {
        self.shadow.get(element_id)
    }

    /// Elements to render: confirmed, then pending, then shadow edits.
    #[must_use]
    pub fn visible_elements(&self) -> Vec<Element> {
        let (mut elements, _) = self.pending.project(&self.elements, &self.strokes);
        for element in &mut elements {
            if let Some(shadow) = self.shadow.get(&element.id) {
                element.clone_from(shadow);
            }
        }
        elements
    }

    /// Strokes to render: confirmed plus pending.
    #[must_use]
    pub fn visible_strokes(&self) -> Vec<Stroke> {
        self.pending.project(&self.elements, &self.strokes).1
    }

    /// Visible version of one element.
    #[must_use]
    pub fn element(&self, element_id: &str) -> Option<Element> {
        self.shadow
            .get(element_id)
            .cloned()
            .or_else(|| self.projected_element(element_id))
    }

    /// Element as confirmed plus pending changes, without the gesture shadow.
    fn projected_element(&self, element_id: &str) -> Option<Element> {
        self.pending
            .project(&self.elements, &self.strokes)
            .0
            .into_iter()
            .find(|e| e.id == element_id)
    }

    /// Confirmed state as a snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Option<SessionSnapshot> {
        if !self.is_joined() {
            return None;
        }
        Some(SessionSnapshot {
            channel_id: self.channel_id.clone().unwrap_or_default(),
            creator_id: self.creator_id.clone().unwrap_or_default(),
            elements: self.elements.clone(),
            strokes: self.strokes.clone(),
            permissions: self.permissions.clone(),
            active_members: self.members.clone(),
        })
    }

    /// Snapshot worth keeping on this device when the board closes: only the
    /// creator, only as the last member present, only if there is content.
    #[must_use]
    pub fn local_snapshot_on_close(&self) -> Option<SessionSnapshot> {
        if !self.is_creator() {
            return None;
        }
        let alone = self.members.len() == 1 && self.members.contains_key(&self.self_user_id);
        if !alone {
            return None;
        }
        self.snapshot().filter(|s| !s.is_blank())
    }
}

// =============================================================================
// LOCAL MUTATIONS
// =============================================================================

impl BoardState {
    /// Place a new element.
    pub fn add_element(&mut self, element: Element) -> Option<Frame> {
        let channel_id = self.drawable_channel()?;
        if self.projected_element(&element.id).is_some() {
            log::debug!("element {} already on the board", element.id);
            return None;
        }
        let frame = requests::element_add(&channel_id, &element);
        self.pending.push(frame.id.clone(), Change::AddElement(element));
        Some(frame)
    }

    /// Remove an element. Absent ids send nothing.
    pub fn delete_element(&mut self, element_id: &str) -> Option<Frame> {
        let channel_id = self.drawable_channel()?;
        if self.projected_element(element_id).is_none() {
            return None;
        }
        if self.gesture.element_id() == Some(element_id) {
            self.cancel_gesture();
        }
        let frame = requests::element_delete(&channel_id, element_id);
        self.pending.push(frame.id.clone(), Change::DeleteElement(element_id.to_owned()));
        Some(frame)
    }

    /// Append a finished stroke.
    pub fn add_stroke(&mut self, stroke: Stroke) -> Option<Frame> {
        let channel_id = self.drawable_channel()?;
        if self.visible_strokes().iter().any(|s| s.id == stroke.id) {
            return None;
        }
        let frame = requests::stroke_add(&channel_id, &stroke);
        self.pending.push(frame.id.clone(), Change::AddStroke(stroke));
        Some(frame)
    }

    /// Empty the board. Creator only.
    pub fn clear(&mut self) -> Option<Frame> {
        if !self.is_creator() {
            return None;
        }
        let channel_id = self.channel_id.clone()?;
        self.shadow.clear();
        self.gesture = Gesture::Idle;
        let frame = requests::clear(&channel_id);
        self.pending.push(frame.id.clone(), Change::Clear);
        Some(frame)
    }

    /// Grant or revoke another member's draw rights. Creator only. The local
    /// map changes when the session broadcasts the result back.
    pub fn set_permission(&self, target_user_id: &str, can_draw: bool) -> Option<Frame> {
        if !self.is_creator() || target_user_id == self.self_user_id {
            return None;
        }
        let channel_id = self.channel_id.as_deref()?;
        Some(requests::permission_set(channel_id, target_user_id, can_draw))
    }

    /// Cursor frame for a sampled position.
    #[must_use]
    pub fn cursor(&self, position: Cursor) -> Option<Frame> {
        if !self.is_joined() {
            return None;
        }
        let channel_id = self.channel_id.as_deref()?;
        Some(requests::cursor(channel_id, position.x, position.y))
    }

    /// Replay a stored snapshot into a fresh, empty session we created.
    /// Returns the add requests to send; empty when replay does not apply.
    pub fn restore_snapshot(&mut self, stored: &SessionSnapshot) -> Vec<Frame> {
        let blank = self.elements.is_empty() && self.strokes.is_empty() && self.pending.is_empty();
        if !self.is_creator() || !blank {
            return Vec::new();
        }
        let mut replay = Vec::with_capacity(stored.elements.len() + stored.strokes.len());
        for element in &stored.elements {
            replay.extend(self.add_element(element.clone()));
        }
        for stroke in &stored.strokes {
            replay.extend(self.add_stroke(stroke.clone()));
        }
        replay
    }

    fn drawable_channel(&self) -> Option<String> {
        if !self.can_draw() {
            log::debug!("local mutation dropped: no draw rights");
            return None;
        }
        self.channel_id.clone()
    }
}

// =============================================================================
// GESTURES
// =============================================================================

impl BoardState {
    /// Start moving an element.
    pub fn begin_drag(&mut self, element_id: &str) -> bool {
        self.begin_element_gesture(element_id, |id| Gesture::Dragging { element_id: id })
    }

    /// Start resizing an element.
    pub fn begin_resize(&mut self, element_id: &str) -> bool {
        self.begin_element_gesture(element_id, |id| Gesture::Resizing { element_id: id })
    }

    /// Focus the body of a `text` or `sticky` element.
    pub fn begin_text_edit(&mut self, element_id: &str) -> bool {
        let editable = self
            .projected_element(element_id)
            .is_some_and(|e| e.content().is_some());
        editable && self.begin_element_gesture(element_id, |id| Gesture::EditingText { element_id: id })
    }

    fn begin_element_gesture(&mut self, element_id: &str, gesture: impl FnOnce(String) -> Gesture) -> bool {
        if !self.can_draw() || !self.gesture.is_idle() {
            log::debug!("gesture on {element_id} ignored");
            return false;
        }
        let Some(element) = self.projected_element(element_id) else {
            return false;
        };
        self.shadow.insert(element_id.to_owned(), element);
        self.gesture = gesture(element_id.to_owned());
        true
    }

    /// Move the dragged element to an absolute position.
    pub fn drag_to(&mut self, x: f64, y: f64) -> bool {
        let Gesture::Dragging { element_id } = &self.gesture else {
            return false;
        };
        let Some(shadow) = self.shadow.get_mut(element_id) else {
            return false;
        };
        shadow.x = x;
        shadow.y = y;
        true
    }

    /// Set the resized element's size. Negative sizes clamp to zero.
    pub fn resize_to(&mut self, w: f64, h: f64) -> bool {
        let Gesture::Resizing { element_id } = &self.gesture else {
            return false;
        };
        let Some(shadow) = self.shadow.get_mut(element_id) else {
            return false;
        };
        shadow.w = w.max(0.0);
        shadow.h = h.max(0.0);
        true
    }

    /// Replace the edited element's text body.
    pub fn edit_text(&mut self, content: &str) -> bool {
        let Gesture::EditingText { element_id } = &self.gesture else {
            return false;
        };
        self.shadow
            .get_mut(element_id)
            .is_some_and(|shadow| shadow.set_content(content))
    }

    /// Start a freehand stroke at its first point.
    pub fn begin_stroke(&mut self, color: &str, width: f64, x: f64, y: f64) -> bool {
        if !self.can_draw() || !self.gesture.is_idle() {
            log::debug!("stroke ignored");
            return false;
        }
        self.gesture = Gesture::Drawing {
            stroke: Stroke {
                id: uuid::Uuid::new_v4().to_string(),
                points: vec![[x, y]],
                color: color.to_owned(),
                width,
            },
        };
        true
    }

    pub fn extend_stroke(&mut self, x: f64, y: f64) -> bool {
        let Gesture::Drawing { stroke } = &mut self.gesture else {
            return false;
        };
        stroke.points.push([x, y]);
        true
    }

    /// End the live gesture at its commit boundary. Returns the one request
    /// it produces, or `None` if nothing changed.
    pub fn commit_gesture(&mut self) -> Option<Frame> {
        match std::mem::take(&mut self.gesture) {
            Gesture::Idle => None,
            Gesture::Drawing { stroke } => {
                if stroke.points.is_empty() {
                    return None;
                }
                self.add_stroke(stroke)
            }
            Gesture::Dragging { element_id } | Gesture::Resizing { element_id } | Gesture::EditingText { element_id } => {
                let edited = self.shadow.remove(&element_id)?;
                let channel_id = self.channel_id.clone()?;
                if self.projected_element(&element_id)? == edited {
                    return None;
                }
                let frame = requests::element_update(&channel_id, &edited);
                self.pending.push(frame.id.clone(), Change::UpdateElement(edited));
                Some(frame)
            }
        }
    }

    /// Abandon the live gesture and its shadow edits.
    pub fn cancel_gesture(&mut self) {
        if let Some(element_id) = self.gesture.element_id() {
            self.shadow.remove(element_id);
        }
        self.gesture = Gesture::Idle;
    }
}
