//! Snapshot freshness metadata
//!
//! Remembers when the record set was last refreshed from the remote store so
//! a load within the TTL can skip the network.

use std::sync::Arc;
use std::time::Duration;

use crate::local::storage::{read_json, write_json, KeyValueStore};
use crate::local::CACHE_TIMESTAMP_KEY;
use crate::shared::error::Result;

#[derive(Debug, Clone)]
pub struct SnapshotCache {
    kv: Arc<dyn KeyValueStore>,
    ttl: Duration,
}

impl SnapshotCache {
    pub fn new(kv: Arc<dyn KeyValueStore>, ttl: Duration) -> Self {
        Self { kv, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Time of the last successful pull, in ms
    pub fn last_refreshed(&self) -> Option<i64> {
        match read_json::<i64>(self.kv.as_ref(), CACHE_TIMESTAMP_KEY) {
            Ok(at) => at,
            Err(e) => {
                tracing::warn!(error = %e, "cache timestamp unreadable, treating as stale");
                None
            }
        }
    }

    /// Whether a pull happened less than one TTL before `now`
    pub fn is_fresh(&self, now: i64) -> bool {
        let ttl_ms = i64::try_from(self.ttl.as_millis()).unwrap_or(i64::MAX);
        match self.last_refreshed() {
            Some(at) => now >= at && now - at < ttl_ms,
            None => false,
        }
    }

    pub fn mark_refreshed(&self, at: i64) -> Result<()> {
        write_json(self.kv.as_ref(), CACHE_TIMESTAMP_KEY, &at)
    }

    pub fn invalidate(&self) -> Result<()> {
        self.kv.remove(CACHE_TIMESTAMP_KEY)
    }
}
