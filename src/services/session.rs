//! Whiteboard session store: authoritative state for one channel.
//!
//! DESIGN
//! ======
//! A `Session` is owned by the registry behind a per-channel mutex; every
//! method here runs with that mutex held, so each operation is applied and
//! fanned out atomically before the next one starts. Mutations check
//! authorization, mutate, then publish one event to every other connection.
//!
//! Connections are keyed by a server-generated `client_id`; membership is
//! keyed by user id. A user with two tabs is one member with two connections,
//! and only leaves presence when the last connection goes.
//!
//! ERROR HANDLING
//! ==============
//! Rejections are returned to the caller for acknowledgement and logging but
//! never published: an unauthorized mutation is invisible to other members.

use std::collections::{HashMap, HashSet, VecDeque};

use frames::events;
use frames::{Element, Member, Permissions, SessionSnapshot, Stroke};
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::frame::{Data, ErrorCode, Frame};
use crate::services::palette;
use crate::services::relay::Relay;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("connection is not a member of this channel")]
    NotMember,
    #[error("member may not draw on this board")]
    Unauthorized,
    #[error("only the session creator may do this")]
    NotCreator,
    #[error("the session creator's draw rights cannot be changed")]
    CreatorImmune,
    #[error("element already exists: {0}")]
    DuplicateElement(String),
    #[error("stroke already exists: {0}")]
    DuplicateStroke(String),
    #[error("element not found: {0}")]
    UnknownElement(String),
}

impl ErrorCode for Rejection {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotMember => "E_NOT_MEMBER",
            Self::Unauthorized => "E_UNAUTHORIZED",
            Self::NotCreator => "E_NOT_CREATOR",
            Self::CreatorImmune => "E_CREATOR_IMMUNE",
            Self::DuplicateElement(_) => "E_DUPLICATE_ELEMENT",
            Self::DuplicateStroke(_) => "E_DUPLICATE_STROKE",
            Self::UnknownElement(_) => "E_UNKNOWN_ELEMENT",
        }
    }
}

/// Server-side view of an active member. Cursor positions are relayed live
/// and never stored.
#[derive(Debug, Clone)]
struct ActiveMember {
    display_name: String,
    color: String,
}

/// Element plus its insertion sequence, which fixes z-order.
#[derive(Debug, Clone)]
struct Placed {
    seq: u64,
    element: Element,
}

pub struct Session {
    channel_id: String,
    creator_id: String,
    elements: HashMap<String, Placed>,
    next_seq: u64,
    strokes: Vec<Stroke>,
    permissions: Permissions,
    members: HashMap<String, ActiveMember>,
    relay: Relay,
}

// =============================================================================
// LIFECYCLE
// =============================================================================

impl Session {
    /// Create an empty session. `creator_id` is fixed for the session's life.
    #[must_use]
    pub fn new(channel_id: impl Into<String>, creator_id: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            creator_id: creator_id.into(),
            elements: HashMap::new(),
            next_seq: 0,
            strokes: Vec::new(),
            permissions: Permissions::new(),
            members: HashMap::new(),
            relay: Relay::default(),
        }
    }

    /// Attach a connection and return the full current state.
    ///
    /// A re-join on an already attached connection swaps its queue. An
    /// existing member keeps its color; the display name is refreshed.
    pub fn join(
        &mut self,
        client_id: Uuid,
        user_id: &str,
        display_name: &str,
        tx: mpsc::Sender<Frame>,
    ) -> SessionSnapshot {
        self.relay.attach(client_id, user_id, tx);

        if let Some(member) = self.members.get_mut(user_id) {
            display_name.clone_into(&mut member.display_name);
        } else {
            let in_use: HashSet<&str> = self.members.values().map(|m| m.color.as_str()).collect();
            let color = palette::allocate(&in_use);
            self.members.insert(
                user_id.to_owned(),
                ActiveMember { display_name: display_name.to_owned(), color },
            );
        }

        info!(
            channel_id = %self.channel_id,
            %client_id,
            %user_id,
            connections = self.relay.len(),
            "member joined session"
        );

        let presence = self.presence_frame(user_id);
        self.publish(presence, Some(client_id));
        self.snapshot()
    }

    /// Detach a connection. The member leaves presence with its last connection.
    pub fn leave(&mut self, client_id: Uuid) {
        let Some(conn) = self.relay.detach(client_id) else {
            return;
        };
        info!(channel_id = %self.channel_id, %client_id, user_id = %conn.user_id, "connection left session");

        if !self.relay.has_user(&conn.user_id) && self.members.remove(&conn.user_id).is_some() {
            let presence = self.presence_frame(&conn.user_id);
            self.publish(presence, None);
        }
    }

    /// True once no connection remains. The registry discards empty sessions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.relay.is_empty()
    }
}

// =============================================================================
// MUTATIONS
// =============================================================================

impl Session {
    /// Place a new element.
    ///
    /// # Errors
    ///
    /// `Unauthorized` without draw rights, `DuplicateElement` if the id exists.
    pub fn add_element(&mut self, client_id: Uuid, element: Element) -> Result<(), Rejection> {
        let user_id = self.authorize_draw(client_id)?;
        if self.elements.contains_key(&element.id) {
            return Err(Rejection::DuplicateElement(element.id));
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        let frame = self.event(events::ELEMENT_ADDED, &user_id, events::KEY_ELEMENT, json!(element));
        self.elements
            .insert(element.id.clone(), Placed { seq, element });
        self.publish(frame, Some(client_id));
        Ok(())
    }

    /// Replace an existing element record wholesale. Keeps its z-order.
    ///
    /// # Errors
    ///
    /// `Unauthorized` without draw rights, `UnknownElement` if the id is absent.
    pub fn update_element(&mut self, client_id: Uuid, element: Element) -> Result<(), Rejection> {
        let user_id = self.authorize_draw(client_id)?;
        let Some(placed) = self.elements.get_mut(&element.id) else {
            return Err(Rejection::UnknownElement(element.id));
        };

        let frame = Frame::request(events::ELEMENT_UPDATED, Data::new())
            .with_channel_id(self.channel_id.clone())
            .with_from(user_id)
            .with_data(events::KEY_ELEMENT, json!(element));
        placed.element = element;
        self.publish(frame, Some(client_id));
        Ok(())
    }

    /// Remove an element. Deleting an absent id is an accepted no-op.
    ///
    /// # Errors
    ///
    /// `Unauthorized` without draw rights.
    pub fn delete_element(&mut self, client_id: Uuid, element_id: &str) -> Result<(), Rejection> {
        let user_id = self.authorize_draw(client_id)?;
        if self.elements.remove(element_id).is_none() {
            return Ok(());
        }

        let frame = self.event(events::ELEMENT_DELETED, &user_id, events::KEY_ELEMENT_ID, json!(element_id));
        self.publish(frame, Some(client_id));
        Ok(())
    }

    /// Append a freehand stroke.
    ///
    /// # Errors
    ///
    /// `Unauthorized` without draw rights, `DuplicateStroke` if the id exists.
    pub fn add_stroke(&mut self, client_id: Uuid, stroke: Stroke) -> Result<(), Rejection> {
        let user_id = self.authorize_draw(client_id)?;
        if self.strokes.iter().any(|s| s.id == stroke.id) {
            return Err(Rejection::DuplicateStroke(stroke.id));
        }

        let frame = self.event(events::STROKE_ADDED, &user_id, events::KEY_STROKE, json!(stroke));
        self.strokes.push(stroke);
        self.publish(frame, Some(client_id));
        Ok(())
    }

    /// Empty the board. Creator only.
    ///
    /// # Errors
    ///
    /// `NotCreator` for anyone but the creator.
    pub fn clear(&mut self, client_id: Uuid) -> Result<(), Rejection> {
        let user_id = self.authorize_creator(client_id)?;
        self.elements.clear();
        self.strokes.clear();

        let frame = Frame::request(events::CLEARED, Data::new())
            .with_channel_id(self.channel_id.clone())
            .with_from(user_id);
        self.publish(frame, Some(client_id));
        Ok(())
    }

    /// Grant or revoke draw rights. Creator only; the creator cannot be targeted.
    /// Publishes the entire permission map to every connection.
    ///
    /// # Errors
    ///
    /// `NotCreator` for anyone but the creator, `CreatorImmune` when the
    /// target is the creator.
    pub fn set_permission(&mut self, client_id: Uuid, target_user_id: &str, can_draw: bool) -> Result<(), Rejection> {
        let user_id = self.authorize_creator(client_id)?;
        if target_user_id == self.creator_id {
            return Err(Rejection::CreatorImmune);
        }

        self.permissions
            .insert(target_user_id.to_owned(), can_draw);
        let frame = self.event(events::PERMISSIONS, &user_id, events::KEY_PERMISSIONS, json!(self.permissions));
        self.publish(frame, None);
        Ok(())
    }

    /// Relay a pointer position to every other connection. Never echoed to
    /// the sender and never stored.
    ///
    /// # Errors
    ///
    /// `NotMember` if the connection is not attached.
    pub fn set_cursor(&mut self, client_id: Uuid, x: f64, y: f64) -> Result<(), Rejection> {
        let user_id = self.actor(client_id)?;
        let frame = Frame::request(events::CURSOR, Data::new())
            .with_channel_id(self.channel_id.clone())
            .with_from(user_id.clone())
            .with_data(events::KEY_USER_ID, user_id)
            .with_data(events::KEY_X, x)
            .with_data(events::KEY_Y, y);
        self.publish(frame, Some(client_id));
        Ok(())
    }
}

// =============================================================================
// QUERIES
// =============================================================================

impl Session {
    #[cfg(test)]
    #[must_use]
    pub fn creator_id(&self) -> &str {
        &self.creator_id
    }

    /// `creator || permissions[user] != false`.
    #[must_use]
    pub fn can_draw(&self, user_id: &str) -> bool {
        user_id == self.creator_id || self.permissions.get(user_id) != Some(&false)
    }

    /// Full state for a joiner. Elements in z-order; cursors omitted.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        let mut placed: Vec<&Placed> = self.elements.values().collect();
        placed.sort_by_key(|p| p.seq);

        SessionSnapshot {
            channel_id: self.channel_id.clone(),
            creator_id: self.creator_id.clone(),
            elements: placed
                .into_iter()
                .map(|p| p.element.clone())
                .collect(),
            strokes: self.strokes.clone(),
            permissions: self.permissions.clone(),
            active_members: self.member_map(),
        }
    }

    fn member_map(&self) -> std::collections::BTreeMap<String, Member> {
        self.members
            .iter()
            .map(|(id, m)| (id.clone(), Member { display_name: m.display_name.clone(), color: m.color.clone() }))
            .collect()
    }
}

// =============================================================================
// HELPERS
// =============================================================================

impl Session {
    fn actor(&self, client_id: Uuid) -> Result<String, Rejection> {
        self.relay
            .user_of(client_id)
            .map(str::to_owned)
            .ok_or(Rejection::NotMember)
    }

    fn authorize_draw(&self, client_id: Uuid) -> Result<String, Rejection> {
        let user_id = self.actor(client_id)?;
        if !self.can_draw(&user_id) {
            return Err(Rejection::Unauthorized);
        }
        Ok(user_id)
    }

    fn authorize_creator(&self, client_id: Uuid) -> Result<String, Rejection> {
        let user_id = self.actor(client_id)?;
        if user_id != self.creator_id {
            return Err(Rejection::NotCreator);
        }
        Ok(user_id)
    }

    /// Broadcast frame carrying a single payload key.
    fn event(&self, syscall: &str, from: &str, key: &str, value: serde_json::Value) -> Frame {
        Frame::request(syscall, Data::new())
            .with_channel_id(self.channel_id.clone())
            .with_from(from)
            .with_data(key, value)
    }

    fn presence_frame(&self, from: &str) -> Frame {
        self.event(events::PRESENCE, from, events::KEY_MEMBERS, json!(self.member_map()))
    }

    /// Fan a frame out, then settle any evictions it caused.
    ///
    /// Evicted members that lost their last connection leave presence, which
    /// is itself published. Frames go out strictly in the order queued here.
    fn publish(&mut self, frame: Frame, exclude: Option<Uuid>) {
        let mut queue = VecDeque::from([(frame, exclude)]);
        while let Some((frame, exclude)) = queue.pop_front() {
            let evicted = self.relay.broadcast(&frame, exclude);
            let mut departed = None;
            for gone in evicted {
                warn!(
                    channel_id = %self.channel_id,
                    client_id = %gone.client_id,
                    user_id = %gone.user_id,
                    "evicted lagging connection"
                );
                if !self.relay.has_user(&gone.user_id) && self.members.remove(&gone.user_id).is_some() {
                    departed = Some(gone.user_id);
                }
            }
            if let Some(user_id) = departed {
                let presence = self.presence_frame(&user_id);
                queue.push_back((presence, None));
            }
        }
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
