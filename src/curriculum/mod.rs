//! # Curriculum Module
//!
//! The concrete content the admin tool authors: study plans with chapters,
//! lessons and videos, learner schedules and progress, and JSON
//! import/export.
//!
//! [`StudyPlan`] is the record payload used with
//! [`SyncEngine`](crate::sync::SyncEngine); the sync core never looks
//! inside it beyond validation.

pub mod plan;
pub mod progress;
pub mod schedule;
pub mod import;

pub use plan::{StudyPlan, Chapter, Lesson, VideoResource, VideoType, VideoCategory, Difficulty};
pub use progress::{UserProgress, VideoProgress, LessonCompletion, DailyStats, Badge};
pub use schedule::StudySchedule;
pub use import::{parse_import, export_plans, ImportOutcome, ImportedPlan};
