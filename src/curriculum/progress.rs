//! Learner progress tree
//!
//! Stored locally per `(userId, scheduleId)` by [`crate::local::ProgressStore`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::curriculum::plan::StudyPlan;
use crate::shared::error::Result;
use crate::sync::SyncEngine;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProgress {
    pub user_id: String,
    pub schedule_id: String,
    #[serde(default)]
    pub current_streak: u32,
    #[serde(default)]
    pub longest_streak: u32,
    #[serde(default)]
    pub last_updated: i64,
    /// Keyed by video id
    #[serde(default)]
    pub video_progress: BTreeMap<String, VideoProgress>,
    /// Keyed by lesson id
    #[serde(default)]
    pub lesson_completions: BTreeMap<String, LessonCompletion>,
    /// Keyed by `YYYY-MM-DD`
    #[serde(default)]
    pub daily_stats: BTreeMap<String, DailyStats>,
    #[serde(default)]
    pub badges: Vec<Badge>,
}

impl UserProgress {
    /// Empty progress for a pair
    pub fn new(user_id: impl Into<String>, schedule_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            schedule_id: schedule_id.into(),
            current_streak: 0,
            longest_streak: 0,
            last_updated: 0,
            video_progress: BTreeMap::new(),
            lesson_completions: BTreeMap::new(),
            daily_stats: BTreeMap::new(),
            badges: Vec::new(),
        }
    }

    /// Whether any completed lesson belongs to `lesson_ids`
    pub fn touches_lessons<'a>(&self, mut lesson_ids: impl Iterator<Item = &'a str>) -> bool {
        lesson_ids.any(|id| self.lesson_completions.contains_key(id))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoProgress {
    pub video_id: String,
    pub lesson_id: String,
    pub watched_seconds: u32,
    pub total_seconds: u32,
    pub is_completed: bool,
    pub last_watched_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonCompletion {
    pub lesson_id: String,
    pub is_completed: bool,
    pub completed_at: Option<i64>,
    #[serde(default)]
    pub completed_video_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStats {
    pub date: String,
    pub videos_completed: u32,
    pub minutes_studied: u32,
    pub lessons_completed: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Badge {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub description: String,
    pub earned_at: i64,
}

impl SyncEngine<StudyPlan> {
    /// Progress of a user on a plan.
    ///
    /// With schedules for the plan, the first one that has progress wins.
    /// Without any, falls back to the first progress blob of the user that
    /// completed a lesson of the plan.
    pub fn progress_for_plan(&self, user_id: &str, plan_id: &str) -> Result<Option<UserProgress>> {
        let progress = self.progress();
        let schedules = self.schedules().for_study_plan(plan_id, Some(user_id));
        if !schedules.is_empty() {
            return Ok(schedules
                .iter()
                .find_map(|schedule| progress.get(user_id, &schedule.id)));
        }

        let Some(record) = self.get_one(plan_id) else {
            return Ok(None);
        };
        let lesson_ids: Vec<&str> = record
            .payload
            .chapters
            .iter()
            .flat_map(|chapter| chapter.lessons.iter().map(|lesson| lesson.id.as_str()))
            .collect();
        Ok(progress
            .list_for_user(user_id)?
            .into_iter()
            .find(|p| p.touches_lessons(lesson_ids.iter().copied())))
    }
}
