//! Fan-out of task generation.
//!
//! One task job per leaf task of a stamped outline, all recorded in one
//! transaction, then one worker per job on the shared batch runner.

use anyhow::{anyhow, Result};
use futures::FutureExt;
use tracing::{info, warn};

use super::task_content::{fail_abandoned_task, run_task_content};
use crate::domains::generation::models::{CourseJobDetails, CourseOutline, TaskJobDetails};
use crate::kernel::{BatchReport, BatchUnit, GenerationJob, JobStatus, ServerDeps};

/// Record and run the task jobs of the course job `token`.
///
/// Does nothing if the job already has task jobs. An outline without any
/// task fails the course job.
pub async fn dispatch(
    course_id: i64,
    outline: &CourseOutline,
    token: &str,
    deps: &ServerDeps,
) -> Result<BatchReport> {
    if !deps.ledger.children_of(token).await?.is_empty() {
        info!(token, "Task jobs already dispatched");
        return Ok(BatchReport::default());
    }

    if outline.task_count() == 0 {
        warn!(token, course_id, "Outline has no tasks, failing course job");
        deps.ledger.set_status(token, JobStatus::Failed).await?;
        return Ok(BatchReport::default());
    }

    let parent: CourseJobDetails = deps.ledger.find(token).await?.details_as()?;

    let jobs = outline
        .leaf_tasks()
        .map(|(concept, task)| {
            GenerationJob::task(
                task.id,
                course_id,
                token,
                &TaskJobDetails {
                    task: task.clone(),
                    concept: concept.clone(),
                    reference_material_id: parent.reference_material_id.clone(),
                    course_job_token: token.to_string(),
                    course_id,
                },
            )
        })
        .collect::<Result<Vec<_>>>()?;

    let created = deps.ledger.create_task_jobs(jobs).await?;

    let mut units = Vec::with_capacity(created.len());
    for job in created {
        if deps
            .ledger
            .claim(&job.token, JobStatus::Started, JobStatus::Started)
            .await?
        {
            units.push(task_unit(job.token, deps.clone()));
        }
    }

    info!(token, course_id, tasks = units.len(), "Dispatching task generation");
    Ok(deps.batch.run(&format!("dispatch {}", token), units).await)
}

/// Run [`dispatch`] under the background supervisor and return immediately.
pub fn dispatch_detached(course_id: i64, outline: CourseOutline, token: String, deps: &ServerDeps) {
    let worker_deps = deps.clone();
    deps.background.spawn(format!("dispatch {}", token), async move {
        let report = dispatch(course_id, &outline, &token, &worker_deps).await?;
        info!(
            token = %token,
            succeeded = report.succeeded,
            failed = report.failed,
            panicked = report.panicked,
            "Task generation batch finished"
        );
        Ok(())
    });
}

/// Batch unit running the task worker for an owned job.
///
/// A panicking worker fails its job instead of leaving it `started`, so
/// the parent still completes.
pub(crate) fn task_unit(token: String, deps: ServerDeps) -> BatchUnit {
    let name = format!("task {}", token);
    let future = async move {
        let worker = {
            let token = token.clone();
            let deps = deps.clone();
            async move { run_task_content(&token, &deps).await }
        };

        match tokio::spawn(worker).await {
            Ok(result) => result,
            Err(join_error) => {
                let reason = format!("task worker panicked: {}", join_error);
                fail_abandoned_task(&token, &reason, &deps).await?;
                Err(anyhow!(reason))
            }
        }
    };
    BatchUnit::new(name, future.boxed())
}
