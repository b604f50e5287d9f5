//! # Sync Engine
//!
//! The facade UI collaborators call. Owns the record store, the remote
//! handle, snapshot cache metadata and the upload guard.
//!
//! ## Operations
//!
//! | Operation | Suspends | Effect |
//! |---|---|---|
//! | `list_all` / `get_one` / `list_dirty` / `dirty_count` | no | read the local set |
//! | `upsert_local` / `remove_local` | no | local write, marks dirty |
//! | `pull_from_remote` | yes | fetch, then reconcile (remote wins) |
//! | `push_to_remote` | yes | batch upload, then mark synced |
//! | `load` | maybe | local set when fresh, otherwise pull |
//!
//! Local state changes only after a remote call has completed successfully.

use std::sync::Arc;
use std::time::Duration;

use crate::local::cache::SnapshotCache;
use crate::local::progress::ProgressStore;
use crate::local::schedules::ScheduleStore;
use crate::local::record::{Payload, Record};
use crate::local::record_store::{PutOptions, RecordStore};
use crate::local::storage::KeyValueStore;
use crate::remote::{FetchFilter, RemoteDocument, RemoteStore};
use crate::shared::config::{SyncConfig, DEFAULT_CACHE_TTL};
use crate::shared::error::Result;
use crate::shared::now_ms;
use crate::sync::observer::EditCountObserver;
use crate::sync::reconcile::{ReconcileReport, RemoteReconciler};
use crate::sync::upload::{BatchUploader, UploadReport};

/// Where [`SyncEngine::load`] got its records from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    /// Local set, pulled within the cache TTL
    Cache,
    /// Freshly reconciled with the remote store
    Remote,
    /// The pull failed; the last-known local set is returned unchanged
    StaleFallback,
}

#[derive(Debug, Clone)]
pub struct LoadOutcome<P> {
    pub records: Vec<Record<P>>,
    pub source: LoadSource,
    /// Why the pull failed, for `StaleFallback`
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PullOutcome<P> {
    /// Merged set after reconciliation
    pub records: Vec<Record<P>>,
    pub report: ReconcileReport,
}

#[derive(Debug)]
pub struct SyncEngine<P: Payload> {
    store: RecordStore<P>,
    remote: Arc<dyn RemoteStore>,
    cache: SnapshotCache,
    uploader: BatchUploader,
}

impl<P: Payload> SyncEngine<P> {
    /// Open the engine over a local store and a remote store
    pub fn open(kv: Arc<dyn KeyValueStore>, remote: Arc<dyn RemoteStore>) -> Self {
        Self {
            cache: SnapshotCache::new(kv.clone(), DEFAULT_CACHE_TTL),
            store: RecordStore::open(kv),
            remote,
            uploader: BatchUploader::new(),
        }
    }

    /// Open with settings taken from `config`
    pub fn with_config(kv: Arc<dyn KeyValueStore>, remote: Arc<dyn RemoteStore>, config: &SyncConfig) -> Self {
        Self::open(kv, remote).with_cache_ttl(config.cache_ttl)
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache = SnapshotCache::new(self.store.kv().clone(), ttl);
        self
    }

    pub fn store(&self) -> &RecordStore<P> {
        &self.store
    }

    /// Progress blobs sharing this engine's local store
    pub fn progress(&self) -> ProgressStore {
        ProgressStore::new(self.store.kv().clone())
    }

    /// Study schedules sharing this engine's local store
    pub fn schedules(&self) -> ScheduleStore {
        ScheduleStore::new(self.store.kv().clone())
    }

    pub fn list_all(&self) -> Vec<Record<P>> {
        self.store.list()
    }

    pub fn get_one(&self, id: &str) -> Option<Record<P>> {
        self.store.get(id)
    }

    /// Apply a local edit immediately; never touches the network
    pub fn upsert_local(&self, id: &str, payload: P) -> Result<Record<P>> {
        self.store.put(id, payload, PutOptions::default())
    }

    pub fn upsert_local_with(&self, id: &str, payload: P, opts: PutOptions) -> Result<Record<P>> {
        self.store.put(id, payload, opts)
    }

    /// Apply several local edits in one write
    pub fn upsert_many(&self, items: Vec<(String, P)>) -> Result<Vec<Record<P>>> {
        self.store.put_many(items, PutOptions::default())
    }

    /// Remove a record locally.
    ///
    /// If the record ever reached the remote store a tombstone is queued and
    /// written by the next [`push_to_remote`](Self::push_to_remote).
    pub fn remove_local(&self, id: &str) -> Result<Option<Record<P>>> {
        let removed = self.store.remove(id)?;
        if let Some(record) = &removed {
            if record.ever_synced() {
                self.store.add_pending_deletion(id)?;
                tracing::debug!(record_id = id, "tombstone queued");
            }
        }
        Ok(removed)
    }

    pub fn list_dirty(&self) -> Vec<Record<P>> {
        self.store.list_dirty()
    }

    pub fn dirty_count(&self) -> usize {
        self.store.dirty_count()
    }

    pub fn subscribe(&self) -> EditCountObserver {
        self.store.subscribe()
    }

    /// Ids waiting for a remote tombstone
    pub fn pending_deletions(&self) -> Vec<String> {
        self.store.pending_deletions()
    }

    /// Whether an upload is running
    pub fn is_uploading(&self) -> bool {
        self.uploader.is_in_flight()
    }

    /// Dirty local ids among `remote_ids`; a pull would discard their edits
    pub fn local_edits_at_risk<'a>(&self, remote_ids: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        let local = self.store.snapshot();
        let mut ids: Vec<String> = remote_ids
            .into_iter()
            .filter(|id| local.get(*id).is_some_and(Record::is_dirty))
            .map(str::to_string)
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }

    /// Fetch the remote snapshot and reconcile it into the local set.
    ///
    /// On fetch failure nothing local changes.
    pub async fn pull_from_remote(&self) -> Result<PullOutcome<P>> {
        let documents = self.fetch().await?;
        self.apply_snapshot(&documents)
    }

    /// Like [`pull_from_remote`](Self::pull_from_remote), but asks `confirm`
    /// before discarding local edits.
    ///
    /// `confirm` receives the ids whose edits would be lost and is only
    /// called when there are any. Declining returns `Ok(None)` and leaves
    /// the local set untouched.
    pub async fn pull_from_remote_confirmed<F>(&self, confirm: F) -> Result<Option<PullOutcome<P>>>
    where
        F: FnOnce(&[String]) -> bool,
    {
        let documents = self.fetch().await?;
        let at_risk = RemoteReconciler::preview_conflicts(&self.store.snapshot(), &documents);
        if !at_risk.is_empty() && !confirm(&at_risk) {
            tracing::info!(at_risk = at_risk.len(), "pull declined to keep local edits");
            return Ok(None);
        }
        self.apply_snapshot(&documents).map(Some)
    }

    /// Upload every dirty record and flush pending tombstones
    pub async fn push_to_remote(&self) -> Result<UploadReport> {
        let report = self.uploader.upload(&self.store, self.remote.as_ref()).await?;
        if !report.uploaded.is_empty() {
            if let Err(e) = self.cache.invalidate() {
                tracing::warn!(error = %e, "failed to invalidate snapshot cache");
            }
        }
        Ok(report)
    }

    /// Local set when the last pull is fresh, otherwise pull.
    ///
    /// A failed pull falls back to the last-known local set.
    pub async fn load(&self, force_refresh: bool) -> LoadOutcome<P> {
        if !force_refresh && self.cache.is_fresh(now_ms()) {
            tracing::debug!("serving records from fresh snapshot");
            return LoadOutcome {
                records: self.store.list(),
                source: LoadSource::Cache,
                error: None,
            };
        }

        match self.pull_from_remote().await {
            Ok(pulled) => LoadOutcome {
                records: pulled.records,
                source: LoadSource::Remote,
                error: None,
            },
            Err(e) => {
                tracing::warn!(error = %e, "pull failed, serving last-known records");
                LoadOutcome {
                    records: self.store.list(),
                    source: LoadSource::StaleFallback,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Drop every local record, tombstone, cache entry and progress blob
    pub fn clear_local_data(&self) -> Result<()> {
        crate::local::clear_all_local_data(self.store.kv().as_ref())?;
        self.store.republish();
        Ok(())
    }

    async fn fetch(&self) -> Result<Vec<RemoteDocument>> {
        match self.remote.fetch_all(FetchFilter::live()).await {
            Ok(documents) => Ok(documents),
            Err(e) => {
                tracing::warn!(error = %e, "remote fetch failed, local records unchanged");
                Err(e)
            }
        }
    }

    fn apply_snapshot(&self, documents: &[RemoteDocument]) -> Result<PullOutcome<P>> {
        let now = now_ms();
        let (records, report) = RemoteReconciler::reconcile(&self.store, documents, now)?;
        if let Err(e) = self.cache.mark_refreshed(now) {
            tracing::warn!(error = %e, "failed to record snapshot time");
        }
        Ok(PullOutcome { records, report })
    }
}
