//! Course-structure worker.
//!
//! Streams the outline of a course and materializes modules and tasks as
//! soon as they become eligible. Every created row commits together with
//! the updated progress cursor, so a resumed run picks up exactly where the
//! last commit left off.
//!
//! Pipeline: stream → plan per emission → create rows + checkpoint → on the
//! final emission stamp the outline, move the job to `pending`, dispatch.

use anyhow::{bail, Context, Result};
use futures::StreamExt;
use tracing::{debug, error, info};

use super::dispatch::dispatch_detached;
use crate::domains::courses::models::{Module, Task};
use crate::domains::generation::events::CourseEvent;
use crate::domains::generation::models::{
    CourseJobDetails, Materialization, PartialOutline, ProgressCursor,
};
use crate::kernel::{GenerationJob, JobLedger, JobStatus, OutlineRequest, ServerDeps};

/// Drive the course job `token` to `pending`, or mark it `failed`.
///
/// The caller must already own the job.
pub async fn run_course_structure(token: &str, deps: &ServerDeps) -> Result<()> {
    let job = deps.ledger.find(token).await?;
    let course_id = job.course_id;

    match generate_outline(&job, deps).await {
        Ok(()) => Ok(()),
        Err(e) => {
            let message = format!("{:#}", e);
            error!(token, course_id, error = %message, "Course structure generation failed");

            deps.ledger
                .set_status(token, JobStatus::Failed)
                .await
                .context("Failed to mark course job as failed")?;
            deps.progress
                .publish(
                    course_id,
                    &CourseEvent::CourseStructureFailed {
                        job_id: token.to_string(),
                        error: message,
                    },
                )
                .await;
            Err(e)
        }
    }
}

async fn generate_outline(job: &GenerationJob, deps: &ServerDeps) -> Result<()> {
    let mut details: CourseJobDetails = job.details_as()?;
    let mut cursor = details.generation_cursor.clone().unwrap_or_default();

    if !cursor.modules.is_empty() {
        info!(token = %job.token, modules = cursor.modules.len(), "Resuming outline from checkpoint");
    }

    let request = OutlineRequest {
        course_description: details.course_description.clone(),
        intended_audience: details.intended_audience.clone(),
        instructions: details.instructions.clone(),
        reference_material_id: details.reference_material_id.clone(),
    };
    let mut stream = deps.generator.stream_outline(&request).await?;

    let mut last: Option<PartialOutline> = None;
    let mut finished = false;

    while let Some(item) = stream.next().await {
        let snapshot = item?;

        let steps = cursor.plan(&snapshot.outline, snapshot.is_final);
        for step in &steps {
            if let Some(event) = materialize(step, job, &mut cursor, &mut details, deps).await? {
                deps.progress.publish(job.course_id, &event).await;
            }
        }

        finished = snapshot.is_final;
        last = Some(snapshot.outline);
        if finished {
            break;
        }
    }

    let outline = match (last, finished) {
        (Some(outline), true) => outline,
        (Some(_), false) => bail!("outline stream ended before the final emission"),
        (None, _) => bail!("outline stream ended without output"),
    };

    let structure = cursor.finalize(&outline);
    info!(
        token = %job.token,
        course_id = job.course_id,
        modules = structure.modules.len(),
        tasks = structure.task_count(),
        "Course outline complete"
    );

    details.course_structure = Some(structure.clone());
    details.generation_cursor = Some(cursor);
    deps.ledger
        .set_status_and_details(
            &job.token,
            JobStatus::Pending,
            &serde_json::to_value(&details)?,
        )
        .await?;

    deps.progress
        .publish(
            job.course_id,
            &CourseEvent::CourseStructureCompleted {
                job_id: job.token.clone(),
            },
        )
        .await;

    if deps.settings.auto_dispatch {
        dispatch_detached(job.course_id, structure, job.token.clone(), deps);
    }
    Ok(())
}

/// Execute one planned step. Row-creating steps commit the row and the
/// checkpoint in one transaction and return the event to announce.
async fn materialize(
    step: &Materialization,
    job: &GenerationJob,
    cursor: &mut ProgressCursor,
    details: &mut CourseJobDetails,
    deps: &ServerDeps,
) -> Result<Option<CourseEvent>> {
    if !step.creates_row() {
        debug!(token = %job.token, ?step, "Skipping superseded outline entry");
        cursor.apply(step, None);
        return Ok(None);
    }

    let mut tx = deps.db_pool.begin().await?;

    let (id, event) = match step {
        Materialization::Module { name, .. } => {
            let module = Module::create_next(job.course_id, name, &mut *tx).await?;
            (module.id, CourseEvent::module_created(&module))
        }
        Materialization::Task {
            module_index,
            name,
            task_type,
            ..
        } => {
            let module_id = cursor
                .module_id(*module_index)
                .with_context(|| format!("task planned under unmaterialized module {}", module_index))?;
            let task = Task::create_draft(job.course_id, module_id, name, *task_type, &mut *tx).await?;
            (task.id, CourseEvent::task_created(&task))
        }
        _ => return Ok(None),
    };

    cursor.apply(step, Some(id));
    details.generation_cursor = Some(cursor.clone());
    JobLedger::save_checkpoint(&mut *tx, &job.token, &serde_json::to_value(&*details)?).await?;
    tx.commit().await?;

    debug!(token = %job.token, id, event = event.name(), "Materialized outline entry");
    Ok(Some(event))
}
