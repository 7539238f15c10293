//! Task-content worker.
//!
//! One structured call per task. Content overwrites whatever the task held
//! before, so re-running a task job is safe.

use anyhow::{Context, Result};
use thiserror::Error;
use tracing::{info, warn};

use crate::domains::courses::models::{NewQuestion, Task};
use crate::domains::generation::events::{CourseEvent, TaskRef};
use crate::domains::generation::models::{Question, TaskContent, TaskJobDetails};
use crate::kernel::{GenerationJob, JobStatus, ServerDeps, TaskContentRequest};

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("provider returned {actual} content for a {expected} task")]
    VariantMismatch {
        expected: &'static str,
        actual: &'static str,
    },
}

/// Generate and store the content of the task job `token`.
///
/// Marks the job `completed` or `failed`, then completes the parent course
/// job once none of its task jobs is still running. The caller must already
/// own the job.
pub async fn run_task_content(token: &str, deps: &ServerDeps) -> Result<()> {
    let job = deps.ledger.find(token).await?;
    let task_id = job.subject_id;

    let outcome = generate_and_store(&job, deps).await;

    match &outcome {
        Ok(()) => {
            deps.ledger.set_status(token, JobStatus::Completed).await?;
            let counts = deps.ledger.aggregate_status(job.course_id).await?;
            info!(token, task_id, total_completed = counts.completed, "Task content generated");
            deps.progress
                .publish(
                    job.course_id,
                    &CourseEvent::TaskCompleted {
                        task: TaskRef { id: task_id },
                        total_completed: counts.completed,
                    },
                )
                .await;
        }
        Err(e) => record_failure(&job, &format!("{:#}", e), deps).await?,
    }

    if let Some(parent) = &job.parent_token {
        complete_parent_if_settled(parent, deps).await?;
    }

    outcome
}

/// Fail a task job whose worker died without recording an outcome.
pub async fn fail_abandoned_task(token: &str, reason: &str, deps: &ServerDeps) -> Result<()> {
    let job = deps.ledger.find(token).await?;
    if job.status.is_terminal() {
        return Ok(());
    }

    record_failure(&job, reason, deps).await?;
    if let Some(parent) = &job.parent_token {
        complete_parent_if_settled(parent, deps).await?;
    }
    Ok(())
}

async fn record_failure(job: &GenerationJob, message: &str, deps: &ServerDeps) -> Result<()> {
    warn!(token = %job.token, task_id = job.subject_id, error = %message, "Task content generation failed");
    deps.ledger.set_status(&job.token, JobStatus::Failed).await?;
    deps.progress
        .publish(
            job.course_id,
            &CourseEvent::TaskFailed {
                task: TaskRef { id: job.subject_id },
                error: message.to_string(),
            },
        )
        .await;
    Ok(())
}

/// Move `parent_token` from `pending` to `completed` once at least one task
/// job exists and none is still running. Returns whether this call did it.
pub async fn complete_parent_if_settled(parent_token: &str, deps: &ServerDeps) -> Result<bool> {
    let counts = deps.ledger.aggregate_status_for_parent(parent_token).await?;
    if !counts.all_settled() {
        return Ok(false);
    }

    let moved = deps
        .ledger
        .transition(parent_token, JobStatus::Pending, JobStatus::Completed)
        .await?;
    if moved {
        info!(
            token = parent_token,
            completed = counts.completed,
            failed = counts.failed,
            "Course generation complete"
        );
    }
    Ok(moved)
}

async fn generate_and_store(job: &GenerationJob, deps: &ServerDeps) -> Result<()> {
    let details: TaskJobDetails = job.details_as()?;
    let expected = details.task.task_type;

    let request = TaskContentRequest {
        task: details.task,
        concept: details.concept,
        reference_material_id: details.reference_material_id,
    };
    let content = deps.generator.generate_task_content(&request).await?;

    if content.task_type() != expected {
        return Err(ContentError::VariantMismatch {
            expected: expected.as_str(),
            actual: content.task_type().as_str(),
        }
        .into());
    }

    let task_id = request.task.id;
    match content {
        TaskContent::LearningMaterial(material) => {
            let blocks = serde_json::to_value(&material.blocks)?;
            Task::publish_learning_material(task_id, &blocks, &deps.db_pool)
                .await
                .with_context(|| format!("Failed to store learning material for task {}", task_id))?;
        }
        TaskContent::Quiz(quiz) => {
            let questions = quiz
                .questions
                .iter()
                .map(stored_question)
                .collect::<Result<Vec<_>>>()?;
            Task::publish_quiz(task_id, &questions, &deps.db_pool)
                .await
                .with_context(|| format!("Failed to store quiz for task {}", task_id))?;
        }
    }

    Ok(())
}

fn stored_question(question: &Question) -> Result<NewQuestion> {
    Ok(NewQuestion {
        question_type: question.question_type.as_str().to_string(),
        answer_type: question.answer_type.unwrap_or_default().as_str().to_string(),
        coding_languages: question
            .coding_languages
            .as_ref()
            .map(serde_json::to_value)
            .transpose()?,
        blocks: serde_json::to_value(&question.blocks)?,
        correct_answer: question
            .correct_answer
            .as_ref()
            .map(serde_json::to_value)
            .transpose()?,
        scorecard: question.scorecard.as_ref().map(serde_json::to_value).transpose()?,
        context: Some(serde_json::to_value(&question.context)?),
    })
}
