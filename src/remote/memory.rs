//! In-memory remote store
//!
//! Behaves like the real document store (atomic batches, tombstones,
//! filtered listing) and lets tests inject failures and latency per
//! operation.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use super::{FetchFilter, RemoteDocument, RemoteStore};
use crate::shared::error::{Result, SyncError};
use crate::shared::now_ms;

/// Remote operation, for failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteOp {
    Fetch,
    BatchWrite,
    SoftDelete,
}

/// Injected failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteFailure {
    /// Fails with `RemoteUnavailable`
    Unavailable,
    /// Fails with `RemoteRejected` carrying this status
    Rejected(u16),
}

impl RemoteFailure {
    fn to_error(&self, op: RemoteOp) -> SyncError {
        match self {
            Self::Unavailable => SyncError::remote_unavailable(format!("{op:?}: injected outage")),
            Self::Rejected(status) => SyncError::remote_rejected(Some(*status), format!("{op:?}: injected rejection")),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryRemote {
    documents: Mutex<BTreeMap<String, RemoteDocument>>,
    failures: Mutex<HashMap<RemoteOp, RemoteFailure>>,
    latency: Mutex<Option<Duration>>,
    fetch_calls: AtomicUsize,
    write_calls: AtomicUsize,
    delete_calls: AtomicUsize,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a document directly, bypassing counters and failures
    pub fn seed(&self, document: RemoteDocument) {
        if let Ok(mut docs) = self.documents.lock() {
            docs.insert(document.id.clone(), document);
        }
    }

    /// Make every call of `op` fail until cleared with `None`
    pub fn set_failure(&self, op: RemoteOp, failure: Option<RemoteFailure>) {
        if let Ok(mut failures) = self.failures.lock() {
            match failure {
                Some(failure) => failures.insert(op, failure),
                None => failures.remove(&op),
            };
        }
    }

    /// Delay every call by `latency`
    pub fn set_latency(&self, latency: Option<Duration>) {
        if let Ok(mut slot) = self.latency.lock() {
            *slot = latency;
        }
    }

    /// Stored document, tombstoned or not
    pub fn get(&self, id: &str) -> Option<RemoteDocument> {
        self.documents.lock().ok()?.get(id).cloned()
    }

    /// Every stored document, tombstones included, ordered by id
    pub fn documents(&self) -> Vec<RemoteDocument> {
        self.documents
            .lock()
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn write_calls(&self) -> usize {
        self.write_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    fn docs(&self) -> Result<MutexGuard<'_, BTreeMap<String, RemoteDocument>>> {
        self.documents
            .lock()
            .map_err(|_| SyncError::remote_unavailable("memory remote lock poisoned"))
    }

    async fn enter(&self, op: RemoteOp) -> Result<()> {
        let latency = self.latency.lock().ok().and_then(|slot| *slot);
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        let failure = self.failures.lock().ok().and_then(|f| f.get(&op).cloned());
        match failure {
            Some(failure) => Err(failure.to_error(op)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    async fn fetch_all(&self, filter: FetchFilter) -> Result<Vec<RemoteDocument>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.enter(RemoteOp::Fetch).await?;
        Ok(self
            .docs()?
            .values()
            .filter(|doc| filter.include_deleted || !doc.is_deleted)
            .cloned()
            .collect())
    }

    async fn batch_write(&self, documents: Vec<RemoteDocument>) -> Result<()> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        self.enter(RemoteOp::BatchWrite).await?;
        if let Some(bad) = documents.iter().find(|doc| doc.id.trim().is_empty()) {
            return Err(SyncError::remote_rejected(
                Some(400),
                format!("document with empty id (updatedAt {})", bad.updated_at),
            ));
        }
        let mut docs = self.docs()?;
        for doc in documents {
            docs.insert(doc.id.clone(), doc);
        }
        Ok(())
    }

    async fn fetch_one(&self, id: &str) -> Result<Option<RemoteDocument>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.enter(RemoteOp::Fetch).await?;
        Ok(self.docs()?.get(id).filter(|doc| !doc.is_deleted).cloned())
    }

    async fn soft_delete(&self, id: &str) -> Result<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.enter(RemoteOp::SoftDelete).await?;
        let mut docs = self.docs()?;
        match docs.get_mut(id) {
            Some(doc) => {
                doc.is_deleted = true;
                doc.updated_at = now_ms();
                Ok(())
            }
            None => Err(SyncError::remote_rejected(Some(404), format!("no document '{id}'"))),
        }
    }
}
