//! # Remote Reconciler
//!
//! Merges a fetched remote snapshot into the local record set.
//!
//! ## Policy
//!
//! The merged set is the union of local and remote ids:
//!
//! - remote only: adopted as `synced`
//! - local only: kept unchanged, so offline authoring survives a sync
//! - both: **remote wins**, the record becomes `synced` and any un-uploaded
//!   local edit is discarded
//!
//! Remote-wins assumes a single admin. Callers that want to warn before
//! discarding edits use [`RemoteReconciler::preview_conflicts`] first.
//!
//! The merged set is written back in one store write. Reconciliation only
//! runs on a snapshot that was fetched successfully.

use std::collections::HashSet;

use crate::local::record::{Payload, Record};
use crate::local::record_store::{RecordMap, RecordStore};
use crate::remote::RemoteDocument;
use crate::shared::error::Result;
use crate::sync::status::{apply_or_keep, discards_local_edit, SyncEvent, SyncStatus};

/// What a reconciliation did, by record id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Remote-only records added locally
    pub adopted: Vec<String>,
    /// Clean local records replaced by the remote copy
    pub refreshed: Vec<String>,
    /// Dirty local records replaced by the remote copy; their edits are gone
    pub overwritten: Vec<String>,
    /// Local-only records left untouched
    pub kept_local: Vec<String>,
    /// Remote documents ignored (tombstoned, pending local deletion, undecodable)
    pub skipped: Vec<String>,
}

impl ReconcileReport {
    pub fn discarded_local_edits(&self) -> bool {
        !self.overwritten.is_empty()
    }
}

/// Stateless merge of remote snapshots into a record set
#[derive(Debug, Clone, Copy, Default)]
pub struct RemoteReconciler;

impl RemoteReconciler {
    /// Dirty local ids that a reconcile with `remote` would overwrite
    pub fn preview_conflicts<P: Payload>(local: &RecordMap<P>, remote: &[RemoteDocument]) -> Vec<String> {
        let mut ids: Vec<String> = remote
            .iter()
            .filter(|doc| !doc.is_deleted)
            .filter(|doc| {
                local
                    .get(&doc.id)
                    .is_some_and(|r| discards_local_edit(Some(r.sync_status), SyncEvent::RemoteFetch))
            })
            .map(|doc| doc.id.clone())
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }

    /// Pure merge. Ids in `excluded` are never adopted or refreshed.
    pub fn merge<P: Payload>(
        mut local: RecordMap<P>,
        remote: &[RemoteDocument],
        excluded: &HashSet<String>,
        now: i64,
    ) -> (RecordMap<P>, ReconcileReport) {
        let mut report = ReconcileReport::default();
        let mut seen = HashSet::new();

        for doc in remote {
            if doc.is_deleted || excluded.contains(&doc.id) {
                report.skipped.push(doc.id.clone());
                continue;
            }
            let payload = match doc.to_payload::<P>() {
                Ok(payload) => payload,
                Err(e) => {
                    tracing::warn!(record_id = %doc.id, error = %e, "skipping undecodable remote document");
                    report.skipped.push(doc.id.clone());
                    continue;
                }
            };
            seen.insert(doc.id.clone());

            let existing = local.get(&doc.id);
            let from = existing.map(|r| r.sync_status);
            let status = apply_or_keep(&doc.id, from, SyncEvent::RemoteFetch).unwrap_or(SyncStatus::Synced);
            let revision = existing.map_or(0, |r| r.revision + 1);
            let created_at = match (doc.created_at, existing) {
                (0, Some(r)) => r.created_at,
                (0, None) => doc.updated_at,
                (at, _) => at,
            };

            match from {
                None => report.adopted.push(doc.id.clone()),
                Some(_) if discards_local_edit(from, SyncEvent::RemoteFetch) => {
                    tracing::warn!(record_id = %doc.id, "remote copy replaced an un-uploaded local edit");
                    report.overwritten.push(doc.id.clone());
                }
                Some(_) => report.refreshed.push(doc.id.clone()),
            }

            local.insert(
                doc.id.clone(),
                Record {
                    id: doc.id.clone(),
                    payload,
                    created_at,
                    updated_at: doc.updated_at,
                    revision,
                    sync_status: status,
                    last_synced_at: Some(now.max(doc.updated_at)),
                },
            );
        }

        report.kept_local = local.keys().filter(|id| !seen.contains(*id)).cloned().collect();
        dedup_sorted(&mut report.adopted);
        dedup_sorted(&mut report.refreshed);
        dedup_sorted(&mut report.overwritten);
        dedup_sorted(&mut report.skipped);
        (local, report)
    }

    /// Merge `remote` into the store and persist the result in one write
    pub fn reconcile<P: Payload>(
        store: &RecordStore<P>,
        remote: &[RemoteDocument],
        now: i64,
    ) -> Result<(Vec<Record<P>>, ReconcileReport)> {
        let excluded: HashSet<String> = store.pending_deletions().into_iter().collect();
        let (merged, report) = Self::merge(store.snapshot(), remote, &excluded, now);
        store.replace_all(&merged)?;

        tracing::info!(
            adopted = report.adopted.len(),
            refreshed = report.refreshed.len(),
            overwritten = report.overwritten.len(),
            kept_local = report.kept_local.len(),
            skipped = report.skipped.len(),
            "reconciled remote snapshot"
        );
        Ok((merged.into_values().collect(), report))
    }
}

fn dedup_sorted(ids: &mut Vec<String>) {
    ids.sort();
    ids.dedup();
}
