//! # Study Plan Tree
//!
//! The concrete record payload: study plan → chapters → lessons → videos.
//! The envelope fields (`id`, timestamps, `isDeleted`) belong to the
//! record and the remote document, not to the payload.
//!
//! Validation runs at the boundary, before a local write is accepted, and
//! walks the whole tree.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::local::record::Payload;
use crate::shared::error::{Result, SyncError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Difficulty {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VideoType {
    #[default]
    Youtube,
    Local,
    Url,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VideoCategory {
    #[default]
    Lesson,
    Practice,
    Quiz,
    Review,
}

/// Exam board used when none is given
pub const DEFAULT_EXAM_BOARD: &str = "GENERAL";

/// Author recorded on plans created by the admin tool
pub const DEFAULT_AUTHOR: &str = "admin";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyPlan {
    pub name: String,
    pub subject_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_exam_board")]
    pub exam_board_id: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default = "default_author")]
    pub created_by: String,
    #[serde(default)]
    pub chapters: Vec<Chapter>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub order: u32,
    #[serde(default)]
    pub lessons: Vec<Lesson>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub order: u32,
    #[serde(default = "default_estimated_minutes")]
    pub estimated_minutes: u32,
    #[serde(default)]
    pub videos: Vec<VideoResource>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoResource {
    pub id: String,
    pub title: String,
    #[serde(rename = "type", default)]
    pub video_type: VideoType,
    /// YouTube id, file path or direct URL depending on `video_type`
    #[serde(default)]
    pub resource_url: String,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub duration_seconds: u32,
    #[serde(default)]
    pub category: VideoCategory,
}

fn default_exam_board() -> String {
    DEFAULT_EXAM_BOARD.to_string()
}

fn default_version() -> u32 {
    1
}

fn default_author() -> String {
    DEFAULT_AUTHOR.to_string()
}

pub(crate) fn default_estimated_minutes() -> u32 {
    30
}

impl StudyPlan {
    /// Empty plan with every optional field at its default
    pub fn new(name: impl Into<String>, subject_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            subject_name: subject_name.into(),
            description: String::new(),
            exam_board_id: default_exam_board(),
            difficulty: Difficulty::default(),
            version: default_version(),
            created_by: default_author(),
            chapters: Vec::new(),
        }
    }

    pub fn with_chapter(mut self, chapter: Chapter) -> Self {
        self.chapters.push(chapter);
        self
    }

    /// All lesson ids in tree order
    pub fn lesson_ids(&self) -> impl Iterator<Item = &str> {
        self.chapters
            .iter()
            .flat_map(|c| c.lessons.iter().map(|l| l.id.as_str()))
    }

    pub fn video_count(&self) -> usize {
        self.chapters
            .iter()
            .flat_map(|c| &c.lessons)
            .map(|l| l.videos.len())
            .sum()
    }

    /// Sum of lesson estimates
    pub fn estimated_minutes(&self) -> u32 {
        self.chapters
            .iter()
            .flat_map(|c| &c.lessons)
            .map(|l| l.estimated_minutes)
            .sum()
    }
}

impl Chapter {
    pub fn new(id: impl Into<String>, name: impl Into<String>, order: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            order,
            lessons: Vec::new(),
        }
    }

    pub fn with_lesson(mut self, lesson: Lesson) -> Self {
        self.lessons.push(lesson);
        self
    }
}

impl Lesson {
    pub fn new(id: impl Into<String>, name: impl Into<String>, order: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            order,
            estimated_minutes: default_estimated_minutes(),
            videos: Vec::new(),
        }
    }

    pub fn with_video(mut self, video: VideoResource) -> Self {
        self.videos.push(video);
        self
    }
}

impl VideoResource {
    pub fn youtube(id: impl Into<String>, title: impl Into<String>, video_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            video_type: VideoType::Youtube,
            resource_url: video_id.into(),
            thumbnail_url: None,
            duration_seconds: 0,
            category: VideoCategory::default(),
        }
    }
}

impl Payload for StudyPlan {
    fn validate(&self) -> Result<()> {
        require_text("name", &self.name)?;
        require_text("subjectName", &self.subject_name)?;
        if self.version == 0 {
            return Err(SyncError::validation("version", "must be at least 1"));
        }

        let mut chapter_ids = HashSet::new();
        let mut lesson_ids = HashSet::new();
        let mut video_ids = HashSet::new();

        for (ci, chapter) in self.chapters.iter().enumerate() {
            let path = format!("chapters[{ci}]");
            require_unique_id(&path, &chapter.id, &mut chapter_ids)?;
            require_text(&format!("{path}.name"), &chapter.name)?;

            for (li, lesson) in chapter.lessons.iter().enumerate() {
                let path = format!("{path}.lessons[{li}]");
                require_unique_id(&path, &lesson.id, &mut lesson_ids)?;
                require_text(&format!("{path}.name"), &lesson.name)?;

                for (vi, video) in lesson.videos.iter().enumerate() {
                    let path = format!("{path}.videos[{vi}]");
                    require_unique_id(&path, &video.id, &mut video_ids)?;
                    require_text(&format!("{path}.title"), &video.title)?;
                }
            }
        }
        Ok(())
    }
}

fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(SyncError::validation(field, "must not be empty"));
    }
    Ok(())
}

fn require_unique_id<'a>(path: &str, id: &'a str, seen: &mut HashSet<&'a str>) -> Result<()> {
    let field = format!("{path}.id");
    require_text(&field, id)?;
    if !seen.insert(id) {
        return Err(SyncError::validation(field, format!("duplicate id '{id}'")));
    }
    Ok(())
}
