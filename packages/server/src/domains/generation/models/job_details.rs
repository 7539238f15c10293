//! Typed views of the `details` document stored on generation jobs.

use serde::{Deserialize, Serialize};

use super::cursor::ProgressCursor;
use super::outline::{CourseOutline, OutlineConcept, OutlineTask};

/// Details of a course-structure job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CourseJobDetails {
    pub course_description: String,
    pub intended_audience: String,
    #[serde(default)]
    pub instructions: Option<String>,
    /// Provider handle of the uploaded reference document
    pub reference_material_id: String,
    /// Stamped outline, present once the stream finished
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_structure: Option<CourseOutline>,
    /// Materialization checkpoint, updated after every created row
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_cursor: Option<ProgressCursor>,
}

/// Details of a task job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskJobDetails {
    pub task: OutlineTask,
    pub concept: OutlineConcept,
    pub reference_material_id: String,
    pub course_job_token: String,
    pub course_id: i64,
}
