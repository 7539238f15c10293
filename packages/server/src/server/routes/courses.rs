use axum::{extract::Extension, Json};
use serde::{Deserialize, Serialize};

use super::ApiError;
use crate::domains::courses::models::Course;
use crate::server::app::AppState;

#[derive(Deserialize)]
pub struct CreateCourseRequest {
    pub name: String,
}

#[derive(Serialize)]
pub struct CreateCourseResponse {
    pub id: i64,
}

/// POST /courses
pub async fn create_course_handler(
    Extension(state): Extension<AppState>,
    Json(body): Json<CreateCourseRequest>,
) -> Result<Json<CreateCourseResponse>, ApiError> {
    let name = body.name.trim();
    if name.is_empty() {
        return Err(ApiError::bad_request("course name must not be empty"));
    }

    let course = Course::create(name, &state.deps.db_pool).await?;
    Ok(Json(CreateCourseResponse { id: course.id }))
}
