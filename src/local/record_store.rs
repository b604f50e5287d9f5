//! # Record Store
//!
//! Manages the record set inside the durable key-value store. The whole set
//! is one serialized blob: every mutation reads the blob, changes it in
//! memory and writes it back with a single `write`, so a failed write leaves
//! the previous set untouched.
//!
//! ## Guarantees
//!
//! - at most one record per id
//! - statuses only change along the edges of [`crate::sync::status`]
//! - a blob that fails to parse is logged and treated as an empty set;
//!   the user can re-sync from the remote store
//!
//! Every successful write recounts the dirty records; subscribers are
//! notified when the count changes.
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use curriculum_sync::local::{MemoryStore, PutOptions, RecordStore};
//! use serde_json::json;
//!
//! let store: RecordStore<serde_json::Value> = RecordStore::open(Arc::new(MemoryStore::new()));
//! store.put("p1", json!({ "name": "Algebra" }), PutOptions::default()).unwrap();
//! assert_eq!(store.dirty_count(), 1);
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::sync::watch;

use crate::local::record::{Payload, Record};
use crate::local::storage::{read_json, write_json, KeyValueStore};
use crate::local::{initialize_storage, PENDING_DELETIONS_KEY, STUDY_PLANS_KEY};
use crate::shared::error::{Result, SyncError};
use crate::shared::now_ms;
use crate::sync::observer::EditCountObserver;
use crate::sync::status::{apply_or_keep, SyncEvent, SyncStatus};

/// In-memory view of the record set, keyed by id
pub type RecordMap<P> = BTreeMap<String, Record<P>>;

/// Options for [`RecordStore::put`]
#[derive(Debug, Clone, Copy, Default)]
pub struct PutOptions {
    /// Timestamp to stamp on the write; defaults to now
    pub at: Option<i64>,
}

impl PutOptions {
    pub fn at(timestamp: i64) -> Self {
        Self { at: Some(timestamp) }
    }
}

/// Result of flipping an upload snapshot to `synced`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkSyncedOutcome {
    /// Records now `synced`
    pub synced: Vec<String>,
    /// Records edited or removed after the snapshot was taken
    pub changed_since_snapshot: Vec<String>,
}

/// Record set persisted as one blob
#[derive(Debug)]
pub struct RecordStore<P: Payload> {
    kv: Arc<dyn KeyValueStore>,
    key: String,
    dirty_tx: watch::Sender<usize>,
    _payload: PhantomData<fn() -> P>,
}

impl<P: Payload> RecordStore<P> {
    /// Open the record set stored under `local_study_plans`
    pub fn open(kv: Arc<dyn KeyValueStore>) -> Self {
        Self::with_key(kv, STUDY_PLANS_KEY)
    }

    /// Open a record set stored under a custom key
    pub fn with_key(kv: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        if let Err(e) = initialize_storage(kv.as_ref()) {
            tracing::warn!(error = %e, "failed to initialise storage version");
        }
        let (dirty_tx, _) = watch::channel(0);
        let store = Self {
            kv,
            key: key.into(),
            dirty_tx,
            _payload: PhantomData,
        };
        store.publish(&store.load());
        store
    }

    /// Storage key of the record set
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Underlying key-value store
    pub fn kv(&self) -> &Arc<dyn KeyValueStore> {
        &self.kv
    }

    /// Look up one record; absence is not an error
    pub fn get(&self, id: &str) -> Option<Record<P>> {
        self.load().remove(id)
    }

    /// All records, ordered by id
    pub fn list(&self) -> Vec<Record<P>> {
        self.load().into_values().collect()
    }

    /// Records with status `new` or `modified`
    pub fn list_dirty(&self) -> Vec<Record<P>> {
        self.load().into_values().filter(Record::is_dirty).collect()
    }

    /// Number of dirty records
    pub fn dirty_count(&self) -> usize {
        self.load().values().filter(|r| r.is_dirty()).count()
    }

    /// Subscribe to dirty-count changes
    pub fn subscribe(&self) -> EditCountObserver {
        EditCountObserver::new(self.dirty_tx.subscribe())
    }

    /// Insert or update a record from a local edit.
    ///
    /// An unseen id is created as `new`. An existing record gets the new
    /// payload and `updatedAt`, and becomes `modified` unless it is still `new`.
    pub fn put(&self, id: &str, payload: P, opts: PutOptions) -> Result<Record<P>> {
        let mut records = self.load_for_write()?;
        let record = Self::apply_put(&mut records, id, payload, opts)?;
        self.persist(&records)?;
        self.cancel_pending_deletions(&[id.to_string()])?;
        tracing::debug!(record_id = id, status = %record.sync_status, "record saved");
        Ok(record)
    }

    /// Apply several local edits in one write
    pub fn put_many(&self, items: Vec<(String, P)>, opts: PutOptions) -> Result<Vec<Record<P>>> {
        let mut records = self.load_for_write()?;
        let mut saved = Vec::with_capacity(items.len());
        for (id, payload) in items {
            saved.push(Self::apply_put(&mut records, &id, payload, opts)?);
        }
        self.persist(&records)?;
        let ids: Vec<String> = saved.iter().map(|r| r.id.clone()).collect();
        self.cancel_pending_deletions(&ids)?;
        tracing::debug!(count = saved.len(), "records saved");
        Ok(saved)
    }

    /// Remove a record entirely and return it.
    ///
    /// The store does not talk to the remote side; if the record ever reached
    /// the remote store the caller must arrange a tombstone.
    pub fn remove(&self, id: &str) -> Result<Option<Record<P>>> {
        let mut records = self.load_for_write()?;
        let removed = records.remove(id);
        if removed.is_some() {
            self.persist(&records)?;
            tracing::debug!(record_id = id, "record removed");
        }
        Ok(removed)
    }

    /// Replace the whole set in one write (used by reconciliation)
    pub fn replace_all(&self, records: &RecordMap<P>) -> Result<()> {
        self.persist(records)
    }

    /// Current set as a map; a corrupt blob reads as empty
    pub fn snapshot(&self) -> RecordMap<P> {
        self.load()
    }

    /// Flip the records of an upload snapshot to `synced`.
    ///
    /// Only records whose revision still matches the snapshot are flipped;
    /// anything edited or removed in the meantime keeps its current state.
    pub fn mark_synced(&self, snapshot: &[Record<P>], at: i64) -> Result<MarkSyncedOutcome> {
        let mut records = self.load_for_write()?;
        let mut outcome = MarkSyncedOutcome::default();

        for uploaded in snapshot {
            match records.get_mut(&uploaded.id) {
                Some(current) if current.revision == uploaded.revision => {
                    if let Some(next) = apply_or_keep(&current.id, Some(current.sync_status), SyncEvent::UploadSuccess) {
                        current.sync_status = next;
                    }
                    current.last_synced_at = Some(at.max(current.updated_at));
                    outcome.synced.push(current.id.clone());
                }
                _ => {
                    tracing::warn!(record_id = %uploaded.id, "record changed during upload, left dirty");
                    outcome.changed_since_snapshot.push(uploaded.id.clone());
                }
            }
        }

        self.persist(&records)?;
        Ok(outcome)
    }

    /// Remember that `id` needs a remote tombstone
    pub fn add_pending_deletion(&self, id: &str) -> Result<()> {
        let mut pending = self.pending_deletion_set();
        if pending.insert(id.to_string()) {
            write_json(self.kv.as_ref(), PENDING_DELETIONS_KEY, &pending)?;
        }
        Ok(())
    }

    /// Ids waiting for a remote tombstone
    pub fn pending_deletions(&self) -> Vec<String> {
        self.pending_deletion_set().into_iter().collect()
    }

    /// Forget tombstones that reached the remote store
    pub fn clear_pending_deletions(&self, ids: &[String]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let mut pending = self.pending_deletion_set();
        let before = pending.len();
        for id in ids {
            pending.remove(id);
        }
        if pending.len() == before {
            return Ok(());
        }
        if pending.is_empty() {
            self.kv.remove(PENDING_DELETIONS_KEY)
        } else {
            write_json(self.kv.as_ref(), PENDING_DELETIONS_KEY, &pending)
        }
    }

    /// A record written again locally must not be tombstoned by the next push
    fn cancel_pending_deletions(&self, ids: &[String]) -> Result<()> {
        let pending = self.pending_deletion_set();
        let revived: Vec<String> = ids.iter().filter(|id| pending.contains(*id)).cloned().collect();
        if revived.is_empty() {
            return Ok(());
        }
        tracing::debug!(count = revived.len(), "local write cancelled pending tombstones");
        self.clear_pending_deletions(&revived)
    }

    fn pending_deletion_set(&self) -> BTreeSet<String> {
        match read_json::<BTreeSet<String>>(self.kv.as_ref(), PENDING_DELETIONS_KEY) {
            Ok(set) => set.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(error = %e, "pending deletion list unreadable, treating as empty");
                BTreeSet::new()
            }
        }
    }

    fn apply_put(records: &mut RecordMap<P>, id: &str, payload: P, opts: PutOptions) -> Result<Record<P>> {
        if id.trim().is_empty() {
            return Err(SyncError::validation("id", "record id must not be empty"));
        }
        payload.validate()?;
        let at = opts.at.unwrap_or_else(now_ms);

        let record = match records.get_mut(id) {
            Some(existing) => {
                if let Some(next) = apply_or_keep(id, Some(existing.sync_status), SyncEvent::LocalEdit) {
                    existing.sync_status = next;
                }
                existing.payload = payload;
                existing.updated_at = at;
                existing.revision += 1;
                existing.clone()
            }
            None => {
                let status = apply_or_keep(id, None, SyncEvent::LocalCreate).unwrap_or(SyncStatus::New);
                let record = Record {
                    id: id.to_string(),
                    payload,
                    created_at: at,
                    updated_at: at,
                    revision: 1,
                    sync_status: status,
                    last_synced_at: None,
                };
                records.insert(id.to_string(), record.clone());
                record
            }
        };
        Ok(record)
    }

    fn decode(&self) -> Result<RecordMap<P>> {
        let list: Vec<Record<P>> = read_json(self.kv.as_ref(), &self.key)?.unwrap_or_default();
        let mut records = RecordMap::new();
        for record in list {
            if records.insert(record.id.clone(), record).is_some() {
                tracing::warn!(key = %self.key, "duplicate record id in stored set, keeping the last copy");
            }
        }
        Ok(records)
    }

    fn load(&self) -> RecordMap<P> {
        match self.decode() {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "record set unreadable, treating as empty");
                RecordMap::new()
            }
        }
    }

    /// Like `load`, but only corruption degrades to empty; I/O failures
    /// abort so a transient read error never overwrites real data.
    fn load_for_write(&self) -> Result<RecordMap<P>> {
        match self.decode() {
            Ok(records) => Ok(records),
            Err(SyncError::StorageCorrupt { key, message }) => {
                tracing::warn!(%key, %message, "record set corrupt, starting from an empty set");
                Ok(RecordMap::new())
            }
            Err(e) => Err(e),
        }
    }

    fn persist(&self, records: &RecordMap<P>) -> Result<()> {
        let list: Vec<&Record<P>> = records.values().collect();
        write_json(self.kv.as_ref(), &self.key, &list)?;
        self.publish(records);
        Ok(())
    }

    /// Recount after the blob was changed behind the store's back
    pub(crate) fn republish(&self) {
        self.publish(&self.load());
    }

    fn publish(&self, records: &RecordMap<P>) {
        let dirty = records.values().filter(|r| r.is_dirty()).count();
        self.dirty_tx.send_if_modified(|current| {
            if *current == dirty {
                return false;
            }
            *current = dirty;
            true
        });
    }
}
