//! Entry points behind the generation routes.

use std::path::{Component, Path};

use anyhow::{ensure, Context, Result};
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use super::course_structure::run_course_structure;
use super::dispatch::dispatch_detached;
use crate::domains::courses::models::Course;
use crate::domains::generation::models::CourseJobDetails;
use crate::kernel::{GenerationJob, JobKind, JobStatus, ServerDeps};

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("course {0} not found")]
    CourseNotFound(i64),
    #[error("invalid reference material key: {0}")]
    InvalidReferenceKey(String),
    #[error("job {token} is not a course structure job of course {course_id}")]
    JobMismatch { token: String, course_id: i64 },
    #[error("job {0} has no completed course structure yet")]
    StructureNotReady(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct CourseStructureRequest {
    pub course_description: String,
    pub intended_audience: String,
    #[serde(default)]
    pub instructions: Option<String>,
    /// File name of the reference document inside the upload folder
    pub reference_material_key: String,
}

/// Upload the reference document, record a course job and start the
/// outline worker in the background. Returns the job token.
pub async fn request_course_structure(
    course_id: i64,
    request: CourseStructureRequest,
    deps: &ServerDeps,
) -> Result<String> {
    Course::find_by_id(course_id, &deps.db_pool)
        .await?
        .ok_or(RequestError::CourseNotFound(course_id))?;

    validate_reference_key(&request.reference_material_key)?;
    let path = deps.settings.upload_folder.join(&request.reference_material_key);
    let contents = tokio::fs::read(&path)
        .await
        .with_context(|| format!("Failed to read reference material {}", path.display()))?;

    let reference_material_id = deps
        .generator
        .upload_reference_material(&request.reference_material_key, contents)
        .await?;

    let details = CourseJobDetails {
        course_description: request.course_description,
        intended_audience: request.intended_audience,
        instructions: request.instructions,
        reference_material_id,
        ..Default::default()
    };
    let job = deps
        .ledger
        .create(GenerationJob::course_structure(course_id, &details)?)
        .await?;
    let claimed = deps
        .ledger
        .claim(&job.token, JobStatus::Started, JobStatus::Started)
        .await?;
    ensure!(claimed, "course job {} was claimed by another worker", job.token);

    info!(token = %job.token, course_id, "Course structure generation requested");

    let token = job.token.clone();
    let worker_deps = deps.clone();
    deps.background.spawn(format!("outline {}", job.token), async move {
        run_course_structure(&token, &worker_deps).await
    });

    Ok(job.token)
}

/// Start task generation for a course job whose outline is complete.
pub async fn request_task_generation(course_id: i64, job_token: &str, deps: &ServerDeps) -> Result<()> {
    let job = deps.ledger.find(job_token).await?;

    if job.kind != JobKind::CourseStructure || job.course_id != course_id {
        return Err(RequestError::JobMismatch {
            token: job_token.to_string(),
            course_id,
        }
        .into());
    }
    if job.status != JobStatus::Pending {
        return Err(RequestError::StructureNotReady(job_token.to_string()).into());
    }

    let details: CourseJobDetails = job.details_as()?;
    let outline = details
        .course_structure
        .ok_or_else(|| RequestError::StructureNotReady(job_token.to_string()))?;

    info!(token = job_token, course_id, tasks = outline.task_count(), "Task generation requested");
    dispatch_detached(course_id, outline, job_token.to_string(), deps);
    Ok(())
}

/// Keys are plain relative paths that stay inside the upload folder.
fn validate_reference_key(key: &str) -> Result<(), RequestError> {
    let path = Path::new(key);
    let plain = !key.trim().is_empty()
        && path.components().all(|c| matches!(c, Component::Normal(_)));
    if plain {
        Ok(())
    } else {
        Err(RequestError::InvalidReferenceKey(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_keys_stay_inside_the_upload_folder() {
        assert!(validate_reference_key("syllabus.pdf").is_ok());
        assert!(validate_reference_key("course-7/notes.pdf").is_ok());
        assert!(validate_reference_key("../secrets.env").is_err());
        assert!(validate_reference_key("/etc/passwd").is_err());
        assert!(validate_reference_key("a/../../b").is_err());
        assert!(validate_reference_key("  ").is_err());
    }
}
