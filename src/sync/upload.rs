//! # Batch Uploader
//!
//! Pushes every dirty record to the remote store in one atomic batch, then
//! flips the uploaded records to `synced` in one local write.
//!
//! ## Guarantees
//!
//! - the batch is exactly the dirty set captured at the start of the call
//! - a failed batch changes nothing locally; a retry is safe
//! - only one upload runs at a time; a second call while one is in flight
//!   fails with [`SyncError::UploadInProgress`]
//! - records edited while the batch was in flight stay dirty
//!
//! Pending tombstones are flushed after the batch. Each tombstone that
//! reaches the remote store (or whose document no longer exists there) is
//! dropped; the rest stay pending for the next push. A tombstone whose id
//! exists locally again is dropped without a remote call, since the batch
//! has just written the live copy.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::local::record::{Payload, Record};
use crate::local::record_store::RecordStore;
use crate::remote::{RemoteDocument, RemoteStore};
use crate::shared::error::{Result, SyncError};
use crate::shared::now_ms;

/// Outcome of one push
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadReport {
    /// Records now `synced`
    pub uploaded: Vec<String>,
    /// Records sent but edited locally before the batch completed; still dirty
    pub changed_during_upload: Vec<String>,
    /// Tombstones written remotely
    pub tombstoned: Vec<String>,
    /// Tombstones that failed and remain pending
    pub tombstones_pending: Vec<String>,
}

impl UploadReport {
    /// Whether the push touched the remote store at all
    pub fn is_noop(&self) -> bool {
        self.uploaded.is_empty()
            && self.changed_during_upload.is_empty()
            && self.tombstoned.is_empty()
            && self.tombstones_pending.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct BatchUploader {
    in_flight: AtomicBool,
}

struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl BatchUploader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    fn acquire(&self) -> Result<InFlightGuard<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| SyncError::UploadInProgress)?;
        Ok(InFlightGuard(&self.in_flight))
    }

    /// Upload the current dirty set and flush pending tombstones
    pub async fn upload<P: Payload>(&self, store: &RecordStore<P>, remote: &dyn RemoteStore) -> Result<UploadReport> {
        let _guard = self.acquire()?;
        let mut report = UploadReport::default();

        let snapshot = store.list_dirty();
        if !snapshot.is_empty() {
            let outcome = Self::send_batch(store, remote, &snapshot).await?;
            report.uploaded = outcome.synced;
            report.changed_during_upload = outcome.changed_since_snapshot;
        }

        let pending = store.pending_deletions();
        if !pending.is_empty() {
            let mut resolved = Vec::new();
            for id in pending {
                if store.get(&id).is_some() {
                    tracing::debug!(record_id = %id, "record recreated locally, tombstone dropped");
                    resolved.push(id);
                    continue;
                }
                match remote.soft_delete(&id).await {
                    Ok(()) => {
                        report.tombstoned.push(id.clone());
                        resolved.push(id);
                    }
                    Err(SyncError::RemoteRejected { status: Some(404), .. }) => {
                        tracing::debug!(record_id = %id, "remote document already gone");
                        resolved.push(id);
                    }
                    Err(e) => {
                        tracing::warn!(record_id = %id, error = %e, "tombstone failed, keeping it pending");
                        report.tombstones_pending.push(id);
                    }
                }
            }
            store.clear_pending_deletions(&resolved)?;
        }

        if report.is_noop() {
            tracing::debug!("nothing to upload");
        } else {
            tracing::info!(
                uploaded = report.uploaded.len(),
                still_dirty = report.changed_during_upload.len(),
                tombstoned = report.tombstoned.len(),
                tombstones_pending = report.tombstones_pending.len(),
                "upload finished"
            );
        }
        Ok(report)
    }

    async fn send_batch<P: Payload>(
        store: &RecordStore<P>,
        remote: &dyn RemoteStore,
        snapshot: &[Record<P>],
    ) -> Result<crate::local::MarkSyncedOutcome> {
        let now = now_ms();
        let documents = snapshot
            .iter()
            .map(|record| RemoteDocument::from_record(record, now))
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(count = documents.len(), "sending batch");
        if let Err(e) = remote.batch_write(documents).await {
            tracing::warn!(error = %e, dirty = snapshot.len(), "batch upload failed, records stay dirty");
            return Err(e);
        }
        store.mark_synced(snapshot, now)
    }
}
