//! # Sync-Status State Machine
//!
//! Every record carries one of three statuses. `new` and `modified` are
//! dirty and get uploaded; `synced` matches the remote copy.
//!
//! | From | Event | To |
//! |---|---|---|
//! | (absent) | local create | new |
//! | (absent) | remote fetch | synced |
//! | new | local edit | new |
//! | modified / synced | local edit | modified |
//! | new / modified / synced | upload success | synced |
//! | any | remote fetch | synced (remote wins) |
//!
//! Deletion is not a state: it removes the record.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Per-record synchronization status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// Authored locally, never uploaded
    New,
    /// Uploaded at least once, edited since
    Modified,
    /// Matches the remote copy
    Synced,
}

impl SyncStatus {
    /// Whether the record belongs in the next upload batch
    pub fn is_dirty(self) -> bool {
        matches!(self, Self::New | Self::Modified)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Modified => "modified",
            Self::Synced => "synced",
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Events that drive status transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncEvent {
    LocalCreate,
    LocalEdit,
    RemoteFetch,
    UploadSuccess,
}

/// A transition that has no edge in the table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no transition from {} on {event:?}", .from.map(SyncStatus::as_str).unwrap_or("absent"))]
pub struct InvalidTransition {
    pub from: Option<SyncStatus>,
    pub event: SyncEvent,
}

/// Compute the status after `event`; `from` is `None` when the record does not exist yet
pub fn transition(from: Option<SyncStatus>, event: SyncEvent) -> Result<SyncStatus, InvalidTransition> {
    use SyncEvent::*;
    use SyncStatus::*;

    match (from, event) {
        (None, LocalCreate) => Ok(New),
        (None, RemoteFetch) => Ok(Synced),
        (Some(New), LocalEdit) => Ok(New),
        (Some(Modified | Synced), LocalEdit) => Ok(Modified),
        (Some(_), UploadSuccess) => Ok(Synced),
        (Some(_), RemoteFetch) => Ok(Synced),
        (Some(_), LocalCreate) | (None, LocalEdit | UploadSuccess) => {
            Err(InvalidTransition { from, event })
        }
    }
}

/// Like [`transition`], but an invalid edge keeps the current status and logs a warning
pub fn apply_or_keep(record_id: &str, from: Option<SyncStatus>, event: SyncEvent) -> Option<SyncStatus> {
    match transition(from, event) {
        Ok(next) => Some(next),
        Err(err) => {
            tracing::warn!(record_id, %err, "rejected status transition");
            from
        }
    }
}

/// Whether applying `event` to a record in `from` throws away an un-uploaded local edit
pub fn discards_local_edit(from: Option<SyncStatus>, event: SyncEvent) -> bool {
    event == SyncEvent::RemoteFetch && from.is_some_and(SyncStatus::is_dirty)
}
