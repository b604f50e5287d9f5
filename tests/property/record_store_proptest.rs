//! Property-based tests for the record store
//!
//! Random sequences of local operations must keep the store's invariants.

use proptest::prelude::*;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

use curriculum_sync::local::{MemoryStore, PutOptions, RecordStore};
use curriculum_sync::sync::SyncStatus;

#[derive(Debug, Clone)]
enum Op {
    Put(u8, u32),
    Remove(u8),
    UploadAll,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0u8..6, any::<u32>()).prop_map(|(id, v)| Op::Put(id, v)),
        1 => (0u8..6).prop_map(Op::Remove),
        1 => Just(Op::UploadAll),
    ]
}

fn id(n: u8) -> String {
    format!("plan_{n}")
}

proptest! {
    #[test]
    fn test_operations_preserve_invariants(ops in prop::collection::vec(op(), 1..40)) {
        let store: RecordStore<Value> = RecordStore::open(Arc::new(MemoryStore::new()));
        let badge = store.subscribe();
        let mut model: BTreeMap<String, (u32, SyncStatus)> = BTreeMap::new();
        let mut clock = 0i64;

        for op in ops {
            clock += 1;
            match op {
                Op::Put(n, v) => {
                    let expected = match model.get(&id(n)).map(|(_, status)| *status) {
                        None | Some(SyncStatus::New) => SyncStatus::New,
                        Some(SyncStatus::Modified | SyncStatus::Synced) => SyncStatus::Modified,
                    };
                    let saved = store.put(&id(n), json!({ "v": v }), PutOptions::at(clock)).unwrap();
                    prop_assert_eq!(saved.sync_status, expected);
                    prop_assert!(saved.is_dirty());
                    model.insert(id(n), (v, expected));
                }
                Op::Remove(n) => {
                    let removed = store.remove(&id(n)).unwrap();
                    prop_assert_eq!(removed.is_some(), model.remove(&id(n)).is_some());
                }
                Op::UploadAll => {
                    let dirty = store.list_dirty();
                    store.mark_synced(&dirty, clock).unwrap();
                    for entry in model.values_mut() {
                        entry.1 = SyncStatus::Synced;
                    }
                }
            }

            let records = store.list();
            let ids: Vec<String> = records.iter().map(|r| r.id.clone()).collect();
            let model_ids: Vec<String> = model.keys().cloned().collect();
            prop_assert_eq!(ids, model_ids);

            for record in &records {
                let (v, status) = model[&record.id];
                prop_assert_eq!(&record.payload, &json!({ "v": v }));
                prop_assert_eq!(record.sync_status, status);
                if record.sync_status == SyncStatus::Synced {
                    prop_assert!(record.last_synced_at.unwrap_or(i64::MIN) >= record.updated_at);
                }
            }

            let dirty = records.iter().filter(|r| r.is_dirty()).count();
            prop_assert_eq!(store.dirty_count(), dirty);
            prop_assert_eq!(badge.count(), dirty);
        }
    }

    #[test]
    fn test_put_then_get_returns_payload(n in 0u8..10, text in ".*") {
        let store: RecordStore<Value> = RecordStore::open(Arc::new(MemoryStore::new()));
        let payload = json!({ "name": text });
        store.put(&id(n), payload.clone(), PutOptions::default()).unwrap();
        prop_assert_eq!(store.get(&id(n)).map(|r| r.payload), Some(payload));
    }
}
