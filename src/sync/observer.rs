//! # Edit-Count Observer
//!
//! Read-side projection of the record store: the number of dirty records,
//! pushed to subscribers whenever a write changes it. Backs the
//! "unsynced changes" badge.
//!
//! ```rust
//! use std::sync::Arc;
//! use curriculum_sync::local::{MemoryStore, PutOptions, RecordStore};
//!
//! let store: RecordStore<serde_json::Value> = RecordStore::open(Arc::new(MemoryStore::new()));
//! let badge = store.subscribe();
//! store.put("p1", serde_json::json!({}), PutOptions::default()).unwrap();
//! assert_eq!(badge.count(), 1);
//! ```

use tokio::sync::watch;

#[derive(Debug, Clone)]
pub struct EditCountObserver {
    rx: watch::Receiver<usize>,
}

impl EditCountObserver {
    pub(crate) fn new(rx: watch::Receiver<usize>) -> Self {
        Self { rx }
    }

    /// Current dirty count
    pub fn count(&self) -> usize {
        *self.rx.borrow()
    }

    pub fn has_unsynced(&self) -> bool {
        self.count() > 0
    }

    /// Wait for the next change and return the new count.
    ///
    /// Returns `None` once the record store has been dropped.
    pub async fn changed(&mut self) -> Option<usize> {
        self.rx.changed().await.ok()?;
        Some(*self.rx.borrow_and_update())
    }
}
