//! Generation triggers.
//!
//! POST /generate/course/:course_id/structure - start streaming the outline
//! POST /generate/course/:course_id/tasks     - fan out task generation

use axum::{
    extract::{Extension, Path},
    Json,
};
use serde::{Deserialize, Serialize};

use super::ApiError;
use crate::domains::generation::{
    request_course_structure, request_task_generation, CourseStructureRequest,
};
use crate::server::app::AppState;

#[derive(Serialize)]
pub struct JobCreatedResponse {
    pub job_uuid: String,
}

#[derive(Deserialize)]
pub struct GenerateTasksRequest {
    pub job_uuid: String,
}

#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

pub async fn generate_structure_handler(
    Extension(state): Extension<AppState>,
    Path(course_id): Path<i64>,
    Json(body): Json<CourseStructureRequest>,
) -> Result<Json<JobCreatedResponse>, ApiError> {
    let job_uuid = request_course_structure(course_id, body, &state.deps).await?;
    Ok(Json(JobCreatedResponse { job_uuid }))
}

pub async fn generate_tasks_handler(
    Extension(state): Extension<AppState>,
    Path(course_id): Path<i64>,
    Json(body): Json<GenerateTasksRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    request_task_generation(course_id, &body.job_uuid, &state.deps).await?;
    Ok(Json(SuccessResponse { success: true }))
}
