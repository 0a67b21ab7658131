//! Session registry: channel id to live session.
//!
//! DESIGN
//! ======
//! Sessions are created lazily by the first joiner, who becomes creator, and
//! discarded when their last connection leaves or is evicted. Nothing outlives the session;
//! the next joiner of the same channel starts a fresh, empty board.
//!
//! LOCKING
//! =======
//! The map sits behind an `RwLock`; each session behind its own `Mutex`.
//! Join and leave hold the map write lock across the session update so a
//! session is never removed while a concurrent join is attaching to it.
//! Mutations take the read lock only long enough to clone the session handle,
//! so traffic on one channel never waits on another.

use std::collections::HashMap;
use std::sync::Arc;

use frames::SessionSnapshot;
use tokio::sync::{Mutex, RwLock, mpsc};
use tracing::info;
use uuid::Uuid;

use crate::frame::Frame;
use crate::services::session::{Rejection, Session};

#[derive(Clone, Default)]
pub struct Registry {
    sessions: Arc<RwLock<HashMap<String, Arc<Mutex<Session>>>>>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a connection to a channel, creating the session if needed.
    pub async fn join(
        &self,
        channel_id: &str,
        client_id: Uuid,
        user_id: &str,
        display_name: &str,
        tx: mpsc::Sender<Frame>,
    ) -> SessionSnapshot {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .entry(channel_id.to_owned())
            .or_insert_with(|| {
                info!(%channel_id, creator_id = %user_id, "session created");
                Arc::new(Mutex::new(Session::new(channel_id, user_id)))
            })
            .clone();

        let mut session = session.lock().await;
        session.join(client_id, user_id, display_name, tx)
    }

    /// Detach a connection. Returns true if the session was discarded.
    pub async fn leave(&self, channel_id: &str, client_id: Uuid) -> bool {
        let mut sessions = self.sessions.write().await;
        let Some(session) = sessions.get(channel_id).cloned() else {
            return false;
        };

        let mut session = session.lock().await;
        session.leave(client_id);
        if !session.is_empty() {
            return false;
        }

        sessions.remove(channel_id);
        info!(%channel_id, "session discarded");
        true
    }

    /// Run `f` against a live session under its mutex.
    ///
    /// # Errors
    ///
    /// `NotMember` when the channel has no session, otherwise whatever `f`
    /// rejects with.
    pub async fn with_session<R>(
        &self,
        channel_id: &str,
        f: impl FnOnce(&mut Session) -> Result<R, Rejection>,
    ) -> Result<R, Rejection> {
        let session = {
            let sessions = self.sessions.read().await;
            sessions
                .get(channel_id)
                .cloned()
                .ok_or(Rejection::NotMember)?
        };

        let (result, emptied) = {
            let mut session = session.lock().await;
            let result = f(&mut session);
            (result, session.is_empty())
        };

        // An eviction can drop the last connection; the next joiner must find
        // no session rather than this one.
        if emptied {
            self.discard_if_empty(channel_id).await;
        }
        result
    }

    /// Remove a session that has no connections left.
    async fn discard_if_empty(&self, channel_id: &str) {
        let mut sessions = self.sessions.write().await;
        let Some(session) = sessions.get(channel_id).cloned() else {
            return;
        };
        if session.lock().await.is_empty() {
            sessions.remove(channel_id);
            info!(%channel_id, "session discarded after eviction");
        }
    }

    /// Current state of a live session, if any.
    #[cfg(test)]
    pub async fn snapshot(&self, channel_id: &str) -> Option<SessionSnapshot> {
        let session = self.sessions.read().await.get(channel_id).cloned()?;
        let snapshot = session.lock().await.snapshot();
        Some(snapshot)
    }

    #[cfg(test)]
    pub async fn channel_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;
