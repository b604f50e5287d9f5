//! Property-based tests for remote reconciliation

use proptest::prelude::*;
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, BTreeSet, HashSet};

use curriculum_sync::local::Record;
use curriculum_sync::remote::RemoteDocument;
use curriculum_sync::sync::{RemoteReconciler, SyncStatus};

fn status() -> impl Strategy<Value = SyncStatus> {
    prop_oneof![Just(SyncStatus::New), Just(SyncStatus::Modified), Just(SyncStatus::Synced)]
}

fn local_set() -> impl Strategy<Value = BTreeMap<u8, SyncStatus>> {
    prop::collection::btree_map(0u8..12, status(), 0..8)
}

fn remote_set() -> impl Strategy<Value = BTreeSet<u8>> {
    prop::collection::btree_set(0u8..12, 0..8)
}

fn record(n: u8, status: SyncStatus) -> Record<Value> {
    Record {
        id: format!("r{n}"),
        payload: json!({ "side": "local" }),
        created_at: 1,
        updated_at: 2,
        revision: 1,
        sync_status: status,
        last_synced_at: (status != SyncStatus::New).then_some(2),
    }
}

fn document(n: u8) -> RemoteDocument {
    let mut fields = Map::new();
    fields.insert("side".to_string(), json!("remote"));
    RemoteDocument {
        id: format!("r{n}"),
        created_at: 1,
        updated_at: 3,
        is_deleted: false,
        fields,
    }
}

proptest! {
    #[test]
    fn test_merge_is_union_with_remote_wins(local in local_set(), remote in remote_set()) {
        let local_map: BTreeMap<String, Record<Value>> = local
            .iter()
            .map(|(n, s)| (format!("r{n}"), record(*n, *s)))
            .collect();
        let docs: Vec<RemoteDocument> = remote.iter().map(|n| document(*n)).collect();

        let (merged, report) = RemoteReconciler::merge(local_map, &docs, &HashSet::new(), 10);

        let expected: BTreeSet<String> = local.keys().chain(remote.iter()).map(|n| format!("r{n}")).collect();
        let actual: BTreeSet<String> = merged.keys().cloned().collect();
        prop_assert_eq!(actual, expected);

        for n in &remote {
            let r = &merged[&format!("r{n}")];
            prop_assert_eq!(r.sync_status, SyncStatus::Synced);
            prop_assert_eq!(&r.payload, &json!({ "side": "remote" }));
            prop_assert!(r.last_synced_at.unwrap_or(i64::MIN) >= r.updated_at);
        }

        for (n, s) in &local {
            if !remote.contains(n) {
                let r = &merged[&format!("r{n}")];
                prop_assert_eq!(r.sync_status, *s);
                prop_assert_eq!(&r.payload, &json!({ "side": "local" }));
            }
        }

        let expected_overwritten = local
            .iter()
            .filter(|(n, s)| remote.contains(*n) && s.is_dirty())
            .count();
        prop_assert_eq!(report.overwritten.len(), expected_overwritten);
        prop_assert_eq!(report.adopted.len(), remote.iter().filter(|n| !local.contains_key(*n)).count());
    }
}
