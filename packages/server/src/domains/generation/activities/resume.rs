//! Startup resumption of unfinished generation jobs.
//!
//! Every incomplete job is claimed first; a job this process cannot claim
//! belongs to a live driver and is left alone. Claimed work runs as one
//! batch on the shared runner.

use anyhow::{anyhow, Result};
use futures::FutureExt;
use tracing::{error, info, warn};

use super::course_structure::run_course_structure;
use super::dispatch::{dispatch_detached, task_unit};
use crate::domains::generation::models::CourseJobDetails;
use crate::kernel::{BatchReport, BatchUnit, GenerationJob, JobStatus, ServerDeps};

/// What resumption did with a pending course job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResumeAction {
    /// Fan-out never started; dispatch from the stored outline
    Dispatch,
    /// All task jobs already settled
    MarkCompleted,
    /// Task jobs are still running or being resumed
    Wait,
}

/// Resume every incomplete job. Returns the report of the resumed batch.
pub async fn resume_all(deps: &ServerDeps) -> Result<BatchReport> {
    let mut units = Vec::new();

    for job in deps.ledger.list_incomplete_course_jobs().await? {
        match job.status {
            JobStatus::Started => {
                if claim(&job, JobStatus::Started, deps).await? {
                    info!(token = %job.token, course_id = job.course_id, "Resuming course outline");
                    units.push(outline_unit(job.token, deps.clone()));
                }
            }
            JobStatus::Pending => {
                if claim(&job, JobStatus::Pending, deps).await? {
                    match resume_pending(&job, deps).await {
                        Ok(action) => info!(token = %job.token, ?action, "Resumed pending course job"),
                        Err(e) => error!(token = %job.token, error = format!("{:#}", e), "Failed to resume pending course job"),
                    }
                }
            }
            _ => {}
        }
    }

    for job in deps.ledger.list_incomplete_task_jobs().await? {
        if job.status == JobStatus::Started && claim(&job, JobStatus::Started, deps).await? {
            info!(token = %job.token, task_id = job.subject_id, "Resuming task content");
            units.push(task_unit(job.token, deps.clone()));
        }
    }

    if units.is_empty() {
        info!("No generation work to resume");
        return Ok(BatchReport::default());
    }

    Ok(deps.batch.run("resume", units).await)
}

async fn claim(job: &GenerationJob, status: JobStatus, deps: &ServerDeps) -> Result<bool> {
    let claimed = deps.ledger.claim(&job.token, status, status).await?;
    if !claimed {
        warn!(token = %job.token, "Generation job owned elsewhere, not resuming");
    }
    Ok(claimed)
}

async fn resume_pending(job: &GenerationJob, deps: &ServerDeps) -> Result<ResumeAction> {
    let counts = deps.ledger.aggregate_status_for_parent(&job.token).await?;

    if counts.total() == 0 {
        let details: CourseJobDetails = job.details_as()?;
        let outline = details
            .course_structure
            .ok_or_else(|| anyhow!("pending course job {} has no stored outline", job.token))?;
        dispatch_detached(job.course_id, outline, job.token.clone(), deps);
        return Ok(ResumeAction::Dispatch);
    }

    if counts.all_settled() {
        deps.ledger
            .transition(&job.token, JobStatus::Pending, JobStatus::Completed)
            .await?;
        return Ok(ResumeAction::MarkCompleted);
    }

    Ok(ResumeAction::Wait)
}

fn outline_unit(token: String, deps: ServerDeps) -> BatchUnit {
    BatchUnit::new(
        format!("outline {}", token),
        async move { run_course_structure(&token, &deps).await }.boxed(),
    )
}
