//! Relay: per-channel fan-out to connected clients.
//!
//! DESIGN
//! ======
//! Each connection owns a bounded `mpsc` queue drained by its websocket task.
//! The relay is owned by one `Session` and only touched while that session's
//! mutex is held, so enqueue order is commit order for every peer.
//!
//! BACKPRESSURE
//! ============
//! A peer whose queue is full is evicted, never skipped. Its queue closes and
//! the client must rejoin for a fresh snapshot.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use uuid::Uuid;

use crate::frame::Frame;

/// One attached websocket connection.
#[derive(Debug)]
pub struct Connection {
    pub user_id: String,
    tx: mpsc::Sender<Frame>,
}

/// A connection dropped by `broadcast` because it could not keep up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evicted {
    pub client_id: Uuid,
    pub user_id: String,
}

#[derive(Debug, Default)]
pub struct Relay {
    connections: HashMap<Uuid, Connection>,
}

impl Relay {
    /// Attach a connection, replacing any previous queue for the same id.
    pub fn attach(&mut self, client_id: Uuid, user_id: impl Into<String>, tx: mpsc::Sender<Frame>) -> Option<Connection> {
        self.connections
            .insert(client_id, Connection { user_id: user_id.into(), tx })
    }

    /// Detach a connection. Dropping the returned value closes its queue.
    pub fn detach(&mut self, client_id: Uuid) -> Option<Connection> {
        self.connections.remove(&client_id)
    }

    /// User id bound to a connection.
    #[must_use]
    pub fn user_of(&self, client_id: Uuid) -> Option<&str> {
        self.connections
            .get(&client_id)
            .map(|c| c.user_id.as_str())
    }

    /// Whether any connection is still attached for `user_id`.
    #[must_use]
    pub fn has_user(&self, user_id: &str) -> bool {
        self.connections.values().any(|c| c.user_id == user_id)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Enqueue a frame for every connection except `exclude`.
    ///
    /// Connections whose queue is full or closed are detached and returned.
    #[must_use]
    pub fn broadcast(&mut self, frame: &Frame, exclude: Option<Uuid>) -> Vec<Evicted> {
        let mut evicted = Vec::new();
        for (client_id, conn) in &self.connections {
            if exclude == Some(*client_id) {
                continue;
            }
            match conn.tx.try_send(frame.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_) | TrySendError::Closed(_)) => {
                    evicted.push(Evicted { client_id: *client_id, user_id: conn.user_id.clone() });
                }
            }
        }
        for gone in &evicted {
            self.connections.remove(&gone.client_id);
        }
        evicted
    }
}

#[cfg(test)]
#[path = "relay_test.rs"]
mod tests;
