//! # Local Storage Module
//!
//! Everything persisted on the device lives in one [`KeyValueStore`],
//! namespaced by key:
//!
//! | Key | Contents |
//! |---|---|
//! | `local_study_plans` | the record set, one JSON array |
//! | `pending_deletions` | ids awaiting a remote tombstone |
//! | `cached_study_plans_timestamp` | time of the last successful pull |
//! | `storage_version` | layout version |
//! | `local_schedules` | study schedules, one JSON array |
//! | `user_progress_<user>__<schedule>` | one progress blob per pair |
//!
//! ## Key Components
//!
//! - `storage.rs`: the key-value trait, memory and file implementations
//! - `record.rs`: the record envelope and payload trait
//! - `record_store.rs`: the record set with sync metadata
//! - `cache.rs`: snapshot freshness metadata
//! - `progress.rs`: per-user progress blobs
//! - `schedules.rs`: study schedules

pub mod storage;
pub mod record;
pub mod record_store;
pub mod cache;
pub mod progress;
pub mod schedules;

pub use storage::{KeyValueStore, MemoryStore, FileStore, read_json, write_json};
pub use record::{Payload, Record};
pub use record_store::{RecordStore, PutOptions, MarkSyncedOutcome};
pub use cache::SnapshotCache;
pub use progress::ProgressStore;
pub use schedules::ScheduleStore;

use crate::shared::error::Result;

/// Key of the serialized record set
pub const STUDY_PLANS_KEY: &str = "local_study_plans";

/// Key of the pending tombstone list
pub const PENDING_DELETIONS_KEY: &str = "pending_deletions";

/// Key of the last-pull timestamp
pub const CACHE_TIMESTAMP_KEY: &str = "cached_study_plans_timestamp";

/// Key of the storage layout version
pub const STORAGE_VERSION_KEY: &str = "storage_version";

/// Key of the schedule list
pub const SCHEDULES_KEY: &str = "local_schedules";

/// Prefix shared by all progress blobs
pub const PROGRESS_KEY_PREFIX: &str = "user_progress_";

/// Current storage layout version
pub const STORAGE_VERSION: u32 = 1;

/// Write the storage version if the store has none yet
pub fn initialize_storage(kv: &dyn KeyValueStore) -> Result<()> {
    if kv.read(STORAGE_VERSION_KEY)?.is_none() {
        write_json(kv, STORAGE_VERSION_KEY, &STORAGE_VERSION)?;
    }
    Ok(())
}

/// Remove every key this crate owns, then re-initialise the storage version
pub fn clear_all_local_data(kv: &dyn KeyValueStore) -> Result<()> {
    for key in [
        STUDY_PLANS_KEY,
        PENDING_DELETIONS_KEY,
        CACHE_TIMESTAMP_KEY,
        STORAGE_VERSION_KEY,
        SCHEDULES_KEY,
    ] {
        kv.remove(key)?;
    }
    for key in kv.keys_with_prefix(PROGRESS_KEY_PREFIX)? {
        kv.remove(&key)?;
    }
    tracing::info!("local data cleared");
    initialize_storage(kv)
}
