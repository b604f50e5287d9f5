//! # JSON Import / Export
//!
//! Import accepts a single plan object or an array of them, in the same
//! camelCase layout the remote store uses. Missing optional fields get
//! defaults and missing ids are generated:
//!
//! | Level | Generated id |
//! |---|---|
//! | plan | `plan_<uuid>` |
//! | chapter | `chapter_<c>` |
//! | lesson | `lesson_<c>_<l>` |
//! | video | `video_<c>_<l>_<v>` |
//!
//! Positions are 1-based. A bad entry is reported as
//! `Plan <n>: <problem>` and does not stop the others.

use serde_json::{Map, Value};
use std::collections::HashSet;
use uuid::Uuid;

use crate::curriculum::plan::{
    default_estimated_minutes, Chapter, Difficulty, Lesson, StudyPlan, VideoCategory, VideoResource, VideoType,
    DEFAULT_AUTHOR, DEFAULT_EXAM_BOARD,
};
use crate::local::record::{Payload, Record};
use crate::shared::error::{Result, SyncError};
use crate::sync::engine::SyncEngine;

/// A plan ready to be stored under `id`
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedPlan {
    pub id: String,
    pub plan: StudyPlan,
}

/// Parsed import file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportOutcome {
    pub plans: Vec<ImportedPlan>,
    /// One message per rejected entry
    pub errors: Vec<String>,
}

impl ImportOutcome {
    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }
}

/// Parse an import document.
///
/// Only malformed JSON fails the whole call; entry problems land in
/// [`ImportOutcome::errors`].
pub fn parse_import(text: &str) -> Result<ImportOutcome> {
    let json: Value = serde_json::from_str(text)
        .map_err(|e| SyncError::validation("json", format!("Invalid JSON file: {e}")))?;
    let entries = match json {
        Value::Array(entries) => entries,
        single => vec![single],
    };

    let mut outcome = ImportOutcome::default();
    let mut seen_ids = HashSet::new();

    for (index, entry) in entries.iter().enumerate() {
        let position = index + 1;
        match convert_plan(entry) {
            Ok(imported) => {
                if !seen_ids.insert(imported.id.clone()) {
                    outcome
                        .errors
                        .push(format!("Plan {position}: duplicate id '{}'", imported.id));
                    continue;
                }
                outcome.plans.push(imported);
            }
            Err(problem) => outcome.errors.push(format!("Plan {position}: {problem}")),
        }
    }

    tracing::debug!(plans = outcome.plans.len(), errors = outcome.errors.len(), "import parsed");
    Ok(outcome)
}

/// Render plans as a pretty JSON array that [`parse_import`] accepts
pub fn export_plans(records: &[Record<StudyPlan>]) -> Result<String> {
    let mut documents = Vec::with_capacity(records.len());
    for record in records {
        let mut document = Map::new();
        document.insert("id".to_string(), Value::String(record.id.clone()));
        if let Value::Object(fields) = serde_json::to_value(&record.payload)? {
            document.extend(fields);
        }
        documents.push(Value::Object(document));
    }
    Ok(serde_json::to_string_pretty(&documents)?)
}

impl SyncEngine<StudyPlan> {
    /// Store every parsed plan locally in one write and return their ids
    pub fn import(&self, outcome: &ImportOutcome) -> Result<Vec<String>> {
        let items: Vec<(String, StudyPlan)> = outcome
            .plans
            .iter()
            .map(|imported| (imported.id.clone(), imported.plan.clone()))
            .collect();
        let saved = self.upsert_many(items)?;
        tracing::info!(count = saved.len(), "plans imported to local edits");
        Ok(saved.into_iter().map(|record| record.id).collect())
    }
}

fn convert_plan(entry: &Value) -> std::result::Result<ImportedPlan, String> {
    let obj = entry.as_object().ok_or("expected a JSON object")?;

    let name = text(obj, "name").ok_or("Missing 'name' field")?;
    let subject_name = text(obj, "subjectName").ok_or("Missing 'subjectName' field")?;
    let chapters = obj
        .get("chapters")
        .and_then(Value::as_array)
        .ok_or("Missing or invalid 'chapters' array")?;

    let id = text(obj, "id").unwrap_or_else(|| format!("plan_{}", Uuid::new_v4().simple()));

    let plan = StudyPlan {
        name,
        subject_name,
        description: text(obj, "description").unwrap_or_default(),
        exam_board_id: text(obj, "examBoardId").unwrap_or_else(|| DEFAULT_EXAM_BOARD.to_string()),
        difficulty: enumeration(obj, "difficulty")?.unwrap_or(Difficulty::Beginner),
        version: positive(obj, "version").unwrap_or(1),
        created_by: text(obj, "createdBy").unwrap_or_else(|| DEFAULT_AUTHOR.to_string()),
        chapters: chapters
            .iter()
            .enumerate()
            .map(|(ci, chapter)| convert_chapter(chapter, ci + 1))
            .collect::<std::result::Result<_, _>>()?,
    };

    plan.validate().map_err(|e| e.to_string())?;
    Ok(ImportedPlan { id, plan })
}

fn convert_chapter(value: &Value, c: usize) -> std::result::Result<Chapter, String> {
    let empty = Map::new();
    let obj = value.as_object().unwrap_or(&empty);
    Ok(Chapter {
        id: text(obj, "id").unwrap_or_else(|| format!("chapter_{c}")),
        name: text(obj, "name").unwrap_or_else(|| format!("Chapter {c}")),
        description: text(obj, "description").unwrap_or_default(),
        order: positive(obj, "order").unwrap_or(position(c)),
        lessons: items(obj, "lessons")
            .enumerate()
            .map(|(li, lesson)| convert_lesson(lesson, c, li + 1))
            .collect::<std::result::Result<_, _>>()?,
    })
}

fn convert_lesson(value: &Value, c: usize, l: usize) -> std::result::Result<Lesson, String> {
    let empty = Map::new();
    let obj = value.as_object().unwrap_or(&empty);
    Ok(Lesson {
        id: text(obj, "id").unwrap_or_else(|| format!("lesson_{c}_{l}")),
        name: text(obj, "name").unwrap_or_else(|| format!("Lesson {l}")),
        description: text(obj, "description").unwrap_or_default(),
        order: positive(obj, "order").unwrap_or(position(l)),
        estimated_minutes: positive(obj, "estimatedMinutes").unwrap_or_else(default_estimated_minutes),
        videos: items(obj, "videos")
            .enumerate()
            .map(|(vi, video)| convert_video(video, c, l, vi + 1))
            .collect::<std::result::Result<_, _>>()?,
    })
}

fn convert_video(value: &Value, c: usize, l: usize, v: usize) -> std::result::Result<VideoResource, String> {
    let empty = Map::new();
    let obj = value.as_object().unwrap_or(&empty);
    Ok(VideoResource {
        id: text(obj, "id").unwrap_or_else(|| format!("video_{c}_{l}_{v}")),
        title: text(obj, "title").unwrap_or_else(|| format!("Video {v}")),
        video_type: enumeration(obj, "type")?.unwrap_or(VideoType::Youtube),
        resource_url: text(obj, "resourceUrl").unwrap_or_default(),
        thumbnail_url: text(obj, "thumbnailUrl"),
        duration_seconds: positive(obj, "durationSeconds").unwrap_or(0),
        category: enumeration(obj, "category")?.unwrap_or(VideoCategory::Lesson),
    })
}

/// Non-empty string field
fn text(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Positive integer field; zero and non-numbers count as absent
fn positive(obj: &Map<String, Value>, key: &str) -> Option<u32> {
    obj.get(key)
        .and_then(Value::as_u64)
        .filter(|n| *n > 0)
        .and_then(|n| u32::try_from(n).ok())
}

fn enumeration<T: serde::de::DeserializeOwned>(
    obj: &Map<String, Value>,
    key: &str,
) -> std::result::Result<Option<T>, String> {
    match text(obj, key) {
        Some(raw) => serde_json::from_value(Value::String(raw.clone()))
            .map(Some)
            .map_err(|_| format!("invalid '{key}' value '{raw}'")),
        None => Ok(None),
    }
}

fn items<'a>(obj: &'a Map<String, Value>, key: &str) -> impl Iterator<Item = &'a Value> {
    obj.get(key).and_then(Value::as_array).into_iter().flatten()
}

fn position(index: usize) -> u32 {
    u32::try_from(index).unwrap_or(u32::MAX)
}
