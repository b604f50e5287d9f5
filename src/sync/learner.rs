//! # Learner Sync
//!
//! Moves learner-owned data between the device and the remote store. Unlike
//! study plans there is no dirty tracking here; each call is an explicit
//! copy in one direction:
//!
//! | Operation | Direction | Conflict rule |
//! |---|---|---|
//! | `push_progress` | local → remote | local blob overwrites the remote document |
//! | `pull_progress` | remote → local | remote document overwrites the local blob |
//! | `pull_schedules` | remote → local | remote copy replaces a local one with the same id |
//!
//! Progress documents are keyed `<userId>__<scheduleId>`.

use std::sync::Arc;

use crate::curriculum::progress::UserProgress;
use crate::curriculum::schedule::StudySchedule;
use crate::local::progress::ProgressStore;
use crate::local::schedules::ScheduleStore;
use crate::local::storage::KeyValueStore;
use crate::remote::{FetchFilter, RemoteDocument, RemoteStore};
use crate::shared::error::Result;
use crate::shared::now_ms;

#[derive(Debug, Clone)]
pub struct LearnerSync {
    progress: ProgressStore,
    schedules: ScheduleStore,
    progress_remote: Arc<dyn RemoteStore>,
    schedule_remote: Arc<dyn RemoteStore>,
}

impl LearnerSync {
    /// `progress_remote` and `schedule_remote` are handles on the progress
    /// and schedule collections
    pub fn new(
        kv: Arc<dyn KeyValueStore>,
        progress_remote: Arc<dyn RemoteStore>,
        schedule_remote: Arc<dyn RemoteStore>,
    ) -> Self {
        Self {
            progress: ProgressStore::new(kv.clone()),
            schedules: ScheduleStore::new(kv),
            progress_remote,
            schedule_remote,
        }
    }

    pub fn progress(&self) -> &ProgressStore {
        &self.progress
    }

    pub fn schedules(&self) -> &ScheduleStore {
        &self.schedules
    }

    /// Remote document id of a progress pair
    pub fn progress_document_id(user_id: &str, schedule_id: &str) -> String {
        format!("{user_id}__{schedule_id}")
    }

    /// Upload the local progress of a pair. Returns `false` when there is none.
    pub async fn push_progress(&self, user_id: &str, schedule_id: &str) -> Result<bool> {
        let Some(progress) = self.progress.get(user_id, schedule_id) else {
            tracing::debug!(user_id, schedule_id, "no local progress to upload");
            return Ok(false);
        };
        let updated_at = if progress.last_updated > 0 { progress.last_updated } else { now_ms() };
        let document = RemoteDocument::from_value(
            Self::progress_document_id(user_id, schedule_id),
            updated_at,
            updated_at,
            serde_json::to_value(&progress)?,
        )?;

        self.progress_remote.batch_write(vec![document]).await?;
        tracing::info!(user_id, schedule_id, "progress uploaded");
        Ok(true)
    }

    /// Replace the local progress of a pair with the remote copy, if any
    pub async fn pull_progress(&self, user_id: &str, schedule_id: &str) -> Result<Option<UserProgress>> {
        let id = Self::progress_document_id(user_id, schedule_id);
        let Some(document) = self.progress_remote.fetch_one(&id).await? else {
            tracing::debug!(%id, "no remote progress");
            return Ok(None);
        };

        let mut progress: UserProgress = document.decode_with_envelope()?;
        // The document id is authoritative for the pair
        progress.user_id = user_id.to_string();
        progress.schedule_id = schedule_id.to_string();
        self.progress.save(&progress)?;
        tracing::info!(user_id, schedule_id, "progress downloaded");
        Ok(Some(progress))
    }

    /// Fetch remote schedules (optionally one user's) and merge them locally.
    ///
    /// Returns the fetched schedules. Documents that fail to decode are
    /// skipped.
    pub async fn pull_schedules(&self, user_id: Option<&str>) -> Result<Vec<StudySchedule>> {
        let documents = self.schedule_remote.fetch_all(FetchFilter::live()).await?;
        let mut fetched = Vec::with_capacity(documents.len());
        for document in &documents {
            match document.decode_with_envelope::<StudySchedule>() {
                Ok(schedule) if user_id.map_or(true, |user| schedule.user_id == user) => fetched.push(schedule),
                Ok(_) => {}
                Err(e) => tracing::warn!(schedule_id = %document.id, error = %e, "skipping undecodable schedule"),
            }
        }

        self.schedules.merge_remote(&fetched)?;
        tracing::info!(count = fetched.len(), "schedules merged");
        Ok(fetched)
    }
}
