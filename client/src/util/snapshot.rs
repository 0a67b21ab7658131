//! Device-local snapshot cache.
//!
//! SYSTEM CONTEXT
//! ==============
//! A creator who closes a board as its last member may keep the content on
//! this device, keyed by channel id. Nothing here is synchronized; only a
//! later session for the same channel on the same device reads it back.

#[cfg(test)]
#[path = "snapshot_test.rs"]
mod snapshot_test;

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use frames::SessionSnapshot;

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("snapshot io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("channel id {0:?} cannot name a snapshot")]
    InvalidChannel(String),
}

pub trait SnapshotStore {
    /// Stored snapshot for `channel_id`, if any.
    ///
    /// # Errors
    ///
    /// Storage or decoding failures.
    fn load(&self, channel_id: &str) -> Result<Option<SessionSnapshot>, SnapshotError>;

    /// Replace the stored snapshot for `snapshot.channel_id`.
    ///
    /// # Errors
    ///
    /// Storage or encoding failures.
    fn save(&self, snapshot: &SessionSnapshot) -> Result<(), SnapshotError>;

    /// Drop the stored snapshot. Missing entries are not an error.
    ///
    /// # Errors
    ///
    /// Storage failures.
    fn remove(&self, channel_id: &str) -> Result<(), SnapshotError>;
}

// =============================================================================
// FILE STORE
// =============================================================================

/// One JSON document per channel under `root`.
#[derive(Clone, Debug)]
pub struct FileSnapshotStore {
    root: PathBuf,
}

impl FileSnapshotStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, channel_id: &str) -> Result<PathBuf, SnapshotError> {
        let name = file_stem(channel_id)?;
        Ok(self.root.join(format!("{name}.json")))
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn load(&self, channel_id: &str) -> Result<Option<SessionSnapshot>, SnapshotError> {
        let path = self.path_for(channel_id)?;
        let raw = match fs::read(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&raw)?))
    }

    fn save(&self, snapshot: &SessionSnapshot) -> Result<(), SnapshotError> {
        let path = self.path_for(&snapshot.channel_id)?;
        let raw = serde_json::to_vec_pretty(snapshot)?;
        fs::create_dir_all(&self.root)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, raw)?;
        fs::rename(&tmp, &path)?;
        log::debug!("snapshot saved to {}", path.display());
        Ok(())
    }

    fn remove(&self, channel_id: &str) -> Result<(), SnapshotError> {
        let path = self.path_for(channel_id)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Channel id mapped to `[A-Za-z0-9_-]`; anything else becomes `_`.
fn file_stem(channel_id: &str) -> Result<String, SnapshotError> {
    if channel_id.is_empty() {
        return Err(SnapshotError::InvalidChannel(channel_id.to_owned()));
    }
    Ok(channel_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect())
}

// =============================================================================
// MEMORY STORE
// =============================================================================

#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    snapshots: Mutex<HashMap<String, SessionSnapshot>>,
}

impl MemorySnapshotStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn load(&self, channel_id: &str) -> Result<Option<SessionSnapshot>, SnapshotError> {
        let snapshots = self.snapshots.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(snapshots.get(channel_id).cloned())
    }

    fn save(&self, snapshot: &SessionSnapshot) -> Result<(), SnapshotError> {
        if snapshot.channel_id.is_empty() {
            return Err(SnapshotError::InvalidChannel(String::new()));
        }
        self.snapshots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(snapshot.channel_id.clone(), snapshot.clone());
        Ok(())
    }

    fn remove(&self, channel_id: &str) -> Result<(), SnapshotError> {
        self.snapshots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(channel_id);
        Ok(())
    }
}
