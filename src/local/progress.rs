//! # Progress Store
//!
//! One blob per `(userId, scheduleId)` pair under
//! `user_progress_<userId>__<scheduleId>`. Progress is device-local and never
//! part of the dirty set.

use std::sync::Arc;

use crate::curriculum::progress::UserProgress;
use crate::local::storage::{read_json, write_json, KeyValueStore};
use crate::local::PROGRESS_KEY_PREFIX;
use crate::shared::error::{Result, SyncError};

const PAIR_SEPARATOR: &str = "__";

#[derive(Debug, Clone)]
pub struct ProgressStore {
    kv: Arc<dyn KeyValueStore>,
}

impl ProgressStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Storage key for a pair
    pub fn key_for(user_id: &str, schedule_id: &str) -> String {
        format!("{PROGRESS_KEY_PREFIX}{user_id}{PAIR_SEPARATOR}{schedule_id}")
    }

    /// Progress for a pair; an unreadable blob reads as absent
    pub fn get(&self, user_id: &str, schedule_id: &str) -> Option<UserProgress> {
        let key = Self::key_for(user_id, schedule_id);
        match read_json(self.kv.as_ref(), &key) {
            Ok(progress) => progress,
            Err(e) => {
                tracing::warn!(%key, error = %e, "progress blob unreadable");
                None
            }
        }
    }

    pub fn save(&self, progress: &UserProgress) -> Result<()> {
        check_segment("userId", &progress.user_id)?;
        check_segment("scheduleId", &progress.schedule_id)?;
        let key = Self::key_for(&progress.user_id, &progress.schedule_id);
        write_json(self.kv.as_ref(), &key, progress)?;
        tracing::debug!(%key, "progress saved");
        Ok(())
    }

    /// Every progress blob of one user, in key order
    pub fn list_for_user(&self, user_id: &str) -> Result<Vec<UserProgress>> {
        let prefix = format!("{PROGRESS_KEY_PREFIX}{user_id}{PAIR_SEPARATOR}");
        let mut all = Vec::new();
        for key in self.kv.keys_with_prefix(&prefix)? {
            match read_json::<UserProgress>(self.kv.as_ref(), &key) {
                Ok(Some(progress)) => all.push(progress),
                Ok(None) => {}
                Err(e) => tracing::warn!(%key, error = %e, "skipping unreadable progress blob"),
            }
        }
        Ok(all)
    }

    pub fn remove(&self, user_id: &str, schedule_id: &str) -> Result<()> {
        self.kv.remove(&Self::key_for(user_id, schedule_id))
    }
}

fn check_segment(field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(SyncError::validation(field, "must not be empty"));
    }
    if value.contains(PAIR_SEPARATOR) {
        return Err(SyncError::validation(field, format!("must not contain '{PAIR_SEPARATOR}'")));
    }
    Ok(())
}
