use axum::{
    extract::{Extension, Path},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::ApiError;
use crate::kernel::{JobKind, JobStatus, JobStatusCounts};
use crate::server::app::AppState;

#[derive(Serialize)]
pub struct JobSummary {
    pub job_uuid: String,
    pub kind: JobKind,
    pub status: JobStatus,
    pub course_id: i64,
    pub subject_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_job_uuid: Option<String>,
    /// Task-job counts, for course jobs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tasks: Option<JobStatusCounts>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// GET /jobs/:token
pub async fn job_handler(
    Extension(state): Extension<AppState>,
    Path(token): Path<String>,
) -> Result<Json<JobSummary>, ApiError> {
    let ledger = &state.deps.ledger;
    let job = ledger.find(&token).await?;

    let tasks = match job.kind {
        JobKind::CourseStructure => Some(ledger.aggregate_status_for_parent(&job.token).await?),
        JobKind::Task => None,
    };

    Ok(Json(JobSummary {
        job_uuid: job.token,
        kind: job.kind,
        status: job.status,
        course_id: job.course_id,
        subject_id: job.subject_id,
        parent_job_uuid: job.parent_token,
        tasks,
        created_at: job.created_at,
        updated_at: job.updated_at,
    }))
}
