//! # Schedule Store
//!
//! All study schedules on the device, as one JSON array under
//! `local_schedules`. Schedules are written locally and refreshed from the
//! remote store; a remote copy replaces the local one with the same id.

use std::sync::Arc;

use crate::curriculum::schedule::StudySchedule;
use crate::local::storage::{read_json, write_json, KeyValueStore};
use crate::local::SCHEDULES_KEY;
use crate::shared::error::{Result, SyncError};
use crate::shared::now_ms;

#[derive(Debug, Clone)]
pub struct ScheduleStore {
    kv: Arc<dyn KeyValueStore>,
}

impl ScheduleStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Every schedule, in stored order; an unreadable blob reads as empty
    pub fn list(&self) -> Vec<StudySchedule> {
        match read_json(self.kv.as_ref(), SCHEDULES_KEY) {
            Ok(schedules) => schedules.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(key = SCHEDULES_KEY, error = %e, "schedules unreadable, treating as empty");
                Vec::new()
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<StudySchedule> {
        self.list().into_iter().find(|s| s.id == id)
    }

    /// Schedules of one study plan, optionally narrowed to one user
    pub fn for_study_plan(&self, plan_id: &str, user_id: Option<&str>) -> Vec<StudySchedule> {
        self.list().into_iter().filter(|s| s.matches(plan_id, user_id)).collect()
    }

    /// Insert or replace a schedule, stamping `updatedAt` (and `createdAt` on insert)
    pub fn save(&self, schedule: StudySchedule) -> Result<StudySchedule> {
        self.save_at(schedule, now_ms())
    }

    pub fn save_at(&self, mut schedule: StudySchedule, at: i64) -> Result<StudySchedule> {
        if schedule.id.trim().is_empty() {
            return Err(SyncError::validation("id", "schedule id must not be empty"));
        }
        if schedule.study_plan_id.trim().is_empty() {
            return Err(SyncError::validation("studyPlanId", "must not be empty"));
        }

        let mut all = self.load_for_write()?;
        schedule.updated_at = at;
        match all.iter_mut().find(|s| s.id == schedule.id) {
            Some(existing) => {
                schedule.created_at = existing.created_at;
                *existing = schedule.clone();
            }
            None => {
                schedule.created_at = at;
                all.push(schedule.clone());
            }
        }
        write_json(self.kv.as_ref(), SCHEDULES_KEY, &all)?;
        tracing::debug!(schedule_id = %schedule.id, "schedule saved");
        Ok(schedule)
    }

    /// Merge schedules fetched from the remote store; remote copies win
    pub fn merge_remote(&self, fetched: &[StudySchedule]) -> Result<()> {
        let mut all = self.load_for_write()?;
        for remote in fetched {
            match all.iter_mut().find(|s| s.id == remote.id) {
                Some(existing) => *existing = remote.clone(),
                None => all.push(remote.clone()),
            }
        }
        write_json(self.kv.as_ref(), SCHEDULES_KEY, &all)
    }

    pub fn remove(&self, id: &str) -> Result<Option<StudySchedule>> {
        let mut all = self.load_for_write()?;
        let Some(index) = all.iter().position(|s| s.id == id) else {
            return Ok(None);
        };
        let removed = all.remove(index);
        write_json(self.kv.as_ref(), SCHEDULES_KEY, &all)?;
        Ok(Some(removed))
    }

    /// Corruption starts over from empty; I/O failures abort the write
    fn load_for_write(&self) -> Result<Vec<StudySchedule>> {
        match read_json(self.kv.as_ref(), SCHEDULES_KEY) {
            Ok(schedules) => Ok(schedules.unwrap_or_default()),
            Err(SyncError::StorageCorrupt { key, message }) => {
                tracing::warn!(%key, %message, "schedules corrupt, starting from an empty list");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }
}
