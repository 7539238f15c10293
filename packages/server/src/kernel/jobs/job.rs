//! Generation job model.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use typed_builder::TypedBuilder;
use uuid::Uuid;

// ============================================================================
// Enums
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Streams the outline of a whole course
    CourseStructure,
    /// Generates the content of one task
    Task,
}

/// Lifecycle of a generation job.
///
/// Course jobs go `started → pending → completed` (or `failed`); task jobs
/// go straight from `started` to `completed` or `failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Started,
    Pending,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

// ============================================================================
// Job Model
// ============================================================================

#[derive(FromRow, Debug, Clone, Serialize, TypedBuilder)]
#[builder(field_defaults(setter(into)))]
pub struct GenerationJob {
    /// Row id, assigned by the database on insert
    #[builder(default)]
    #[serde(skip)]
    pub id: i64,

    /// Opaque token handed out to clients
    #[builder(default = Uuid::new_v4().to_string())]
    pub token: String,

    pub kind: JobKind,

    /// Course id for course jobs, task id for task jobs
    pub subject_id: i64,
    pub course_id: i64,

    /// Token of the course job that spawned a task job
    #[builder(default, setter(strip_option))]
    pub parent_token: Option<String>,

    #[builder(default)]
    pub status: JobStatus,

    #[builder(default = serde_json::json!({}))]
    pub details: serde_json::Value,

    /// Process instance currently driving the job
    #[builder(default, setter(strip_option))]
    pub owner: Option<String>,

    #[builder(default = Utc::now())]
    pub created_at: DateTime<Utc>,
    #[builder(default = Utc::now())]
    pub updated_at: DateTime<Utc>,
}

impl GenerationJob {
    /// A new course-structure job for `course_id`.
    pub fn course_structure(course_id: i64, details: &impl Serialize) -> Result<Self> {
        Ok(Self::builder()
            .kind(JobKind::CourseStructure)
            .subject_id(course_id)
            .course_id(course_id)
            .details(serde_json::to_value(details).context("Failed to serialize job details")?)
            .build())
    }

    /// A new task job spawned by the course job `parent_token`.
    pub fn task(
        task_id: i64,
        course_id: i64,
        parent_token: &str,
        details: &impl Serialize,
    ) -> Result<Self> {
        Ok(Self::builder()
            .kind(JobKind::Task)
            .subject_id(task_id)
            .course_id(course_id)
            .parent_token(parent_token.to_string())
            .details(serde_json::to_value(details).context("Failed to serialize job details")?)
            .build())
    }

    /// Typed view of the details document.
    pub fn details_as<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.details.clone())
            .with_context(|| format!("Malformed details for generation job {}", self.token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_jobs_start_unowned_with_fresh_tokens() {
        let a = GenerationJob::course_structure(7, &json!({"course_description": "x"})).unwrap();
        let b = GenerationJob::course_structure(7, &json!({})).unwrap();

        assert_eq!(a.status, JobStatus::Started);
        assert_eq!(a.kind, JobKind::CourseStructure);
        assert_eq!(a.subject_id, 7);
        assert!(a.owner.is_none());
        assert_ne!(a.token, b.token);
        assert!(Uuid::parse_str(&a.token).is_ok());
    }

    #[test]
    fn task_jobs_point_at_their_parent() {
        let job = GenerationJob::task(11, 7, "parent-token", &json!({})).unwrap();
        assert_eq!(job.kind, JobKind::Task);
        assert_eq!(job.subject_id, 11);
        assert_eq!(job.course_id, 7);
        assert_eq!(job.parent_token.as_deref(), Some("parent-token"));
    }

    #[test]
    fn terminal_statuses() {
        assert!(!JobStatus::Started.is_terminal());
        assert!(!JobStatus::Pending.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
    }
}
