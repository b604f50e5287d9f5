//! Study schedules
//!
//! A schedule is one learner's plan for working through a study plan: which
//! days they study, how long, and the exam date. Progress blobs are keyed by
//! schedule id.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudySchedule {
    pub id: String,
    pub user_id: String,
    pub study_plan_id: String,
    /// Plan version the schedule was built against
    #[serde(default = "default_plan_version")]
    pub study_plan_version: u32,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_exam_date: Option<i64>,
    /// Weekday names, e.g. `"monday"`
    #[serde(default)]
    pub study_days: Vec<String>,
    #[serde(default)]
    pub hours_per_day: f64,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
}

fn default_plan_version() -> u32 {
    1
}

impl StudySchedule {
    pub fn new(
        id: impl Into<String>,
        user_id: impl Into<String>,
        study_plan_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
            study_plan_id: study_plan_id.into(),
            study_plan_version: default_plan_version(),
            name: name.into(),
            final_exam_date: None,
            study_days: Vec::new(),
            hours_per_day: 0.0,
            created_at: 0,
            updated_at: 0,
        }
    }

    pub fn with_study_days<I, S>(mut self, days: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.study_days = days.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_hours_per_day(mut self, hours: f64) -> Self {
        self.hours_per_day = hours;
        self
    }

    pub fn with_final_exam_date(mut self, at: i64) -> Self {
        self.final_exam_date = Some(at);
        self
    }

    /// Whether the schedule belongs to `plan_id`, and to `user_id` when given
    pub fn matches(&self, plan_id: &str, user_id: Option<&str>) -> bool {
        self.study_plan_id == plan_id && user_id.map_or(true, |user| self.user_id == user)
    }
}
