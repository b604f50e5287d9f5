//! Record envelope
//!
//! A [`Record`] wraps an opaque payload with the metadata the sync core
//! needs. The payload is never inspected beyond [`Payload::validate`].

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::shared::error::Result;
use crate::sync::status::SyncStatus;

/// Entity content that can be synchronized
pub trait Payload: Serialize + DeserializeOwned + Clone + Send + Sync + std::fmt::Debug + 'static {
    /// Boundary validation run before a local write is accepted
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

impl Payload for serde_json::Value {}

/// One synchronizable entity plus its sync metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record<P> {
    pub id: String,
    pub payload: P,
    /// Milliseconds since the epoch
    pub created_at: i64,
    /// Milliseconds since the epoch
    pub updated_at: i64,
    /// Bumped by every local write; an upload only settles the revision it sent
    #[serde(default)]
    pub revision: u64,
    pub sync_status: SyncStatus,
    /// Set only on transition into `synced`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_synced_at: Option<i64>,
}

impl<P> Record<P> {
    /// Whether the record belongs in the next upload
    pub fn is_dirty(&self) -> bool {
        self.sync_status.is_dirty()
    }

    /// Whether the record ever reached the remote store
    pub fn ever_synced(&self) -> bool {
        self.last_synced_at.is_some()
    }
}
