//! Startup resumption after a simulated crash.
//!
//! A crash is modelled by aborting the worker mid-stream and building a
//! second process instance (`TestHarness::restart`) over the same database.

mod common;

use std::time::Duration;

use crate::common::{settle, two_module_outline, two_task_outline, TestHarness};
use coursegen_core::domains::courses::models::{Module, Question, Task, TaskStatus, TaskType};
use coursegen_core::domains::generation::models::{CourseJobDetails, TaskJobDetails};
use coursegen_core::domains::generation::{resume_all, run_course_structure};
use coursegen_core::kernel::{GenerationJob, JobStatus, ServerDeps};
use serde_json::json;
use test_context::test_context;

async fn wait_for_tasks(ctx: &TestHarness, course_id: i64, count: usize) {
    for _ in 0..500 {
        if Task::list_for_course(course_id, &ctx.db_pool).await.unwrap().len() >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("worker never materialized {} tasks", count);
}

/// Run the outline without fan-out so the course job stops in `pending`.
async fn outline_only(ctx: &TestHarness, course_id: i64) -> String {
    let (mock, mut deps) = ctx.restart();
    deps.settings.auto_dispatch = false;
    mock.script_outline(two_task_outline());

    let token = ctx.start_course_job(course_id).await.unwrap();
    run_course_structure(&token, &deps).await.unwrap();
    token
}

/// Record the task jobs of `token` without running them.
async fn record_children(deps: &ServerDeps, token: &str) -> Vec<GenerationJob> {
    let job = deps.ledger.find(token).await.unwrap();
    let details: CourseJobDetails = job.details_as().unwrap();
    let outline = details.course_structure.unwrap();

    let jobs = outline
        .leaf_tasks()
        .map(|(concept, task)| {
            GenerationJob::task(
                task.id,
                job.course_id,
                token,
                &TaskJobDetails {
                    task: task.clone(),
                    concept: concept.clone(),
                    reference_material_id: details.reference_material_id.clone(),
                    course_job_token: token.to_string(),
                    course_id: job.course_id,
                },
            )
            .unwrap()
        })
        .collect();
    deps.ledger.create_task_jobs(jobs).await.unwrap()
}

// =============================================================================
// Outline resumption
// =============================================================================

#[test_context(TestHarness)]
#[tokio::test]
async fn crashed_outline_resumes_without_duplicates(ctx: &TestHarness) {
    let course_id = ctx.create_course("Rust 201").await.unwrap();
    let token = ctx.start_course_job(course_id).await.unwrap();

    // First instance materializes the first module, then hangs
    let emissions = two_module_outline().into_iter().take(2).collect();
    ctx.mock.script_outline_stall(emissions);
    let worker = {
        let deps = ctx.deps.clone();
        let token = token.clone();
        tokio::spawn(async move { run_course_structure(&token, &deps).await })
    };
    wait_for_tasks(ctx, course_id, 2).await;
    worker.abort();
    let _ = worker.await;

    let job = ctx.deps.ledger.find(&token).await.unwrap();
    assert_eq!(job.status, JobStatus::Started);
    let details: CourseJobDetails = job.details_as().unwrap();
    assert_eq!(details.generation_cursor.unwrap().modules.len(), 1);

    // Second instance replays the whole stream from the start
    let (mock, deps) = ctx.restart();
    mock.script_outline(two_module_outline());

    let report = resume_all(&deps).await.unwrap();
    assert_eq!(report.succeeded, 1);
    settle(&deps).await;

    let modules = Module::list_for_course(course_id, &ctx.db_pool).await.unwrap();
    let names: Vec<&str> = modules.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["Basics", "Traits"]);

    let tasks = Task::list_for_course(course_id, &ctx.db_pool).await.unwrap();
    assert_eq!(tasks.len(), 3);
    assert!(tasks.iter().all(|t| t.status == TaskStatus::Published));

    let job = deps.ledger.find(&token).await.unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.owner.as_deref(), Some(deps.ledger.owner_id()));
    assert_eq!(mock.outline_calls(), 1);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn resumed_outline_keeps_rows_from_the_crashed_run(ctx: &TestHarness) {
    let course_id = ctx.create_course("Rust 201").await.unwrap();
    let token = ctx.start_course_job(course_id).await.unwrap();

    ctx.mock.script_outline_stall(vec![json!({"modules": [{"name": "Basics", "concepts": [
        {"name": "Syntax", "tasks": [{"name": "Quiz one", "type": "quiz"}]}
    ]}]})]);
    let worker = {
        let deps = ctx.deps.clone();
        let token = token.clone();
        tokio::spawn(async move { run_course_structure(&token, &deps).await })
    };
    wait_for_tasks(ctx, course_id, 1).await;
    worker.abort();
    let _ = worker.await;

    // The replay disagrees with what was already written at every position
    let (mock, deps) = ctx.restart();
    mock.script_outline(vec![json!({"modules": [{"name": "Introduction", "concepts": [
        {"name": "Syntax", "tasks": [
            {"name": "Reading one", "description": "Read this", "type": "learning_material"}
        ]}
    ]}]})]);

    resume_all(&deps).await.unwrap();
    settle(&deps).await;

    let modules = Module::list_for_course(course_id, &ctx.db_pool).await.unwrap();
    assert_eq!(modules.len(), 1);
    assert_eq!(modules[0].name, "Basics");

    let tasks = Task::list_for_course(course_id, &ctx.db_pool).await.unwrap();
    assert_eq!(tasks.len(), 1);
    let task = &tasks[0];
    assert_eq!(task.name, "Quiz one");
    assert_eq!(task.task_type, TaskType::Quiz);
    assert_eq!(task.status, TaskStatus::Published);
    assert!(task.blocks.is_none());
    assert!(!Question::list_for_task(task.id, &ctx.db_pool).await.unwrap().is_empty());
    assert_eq!(mock.task_calls(), vec!["Quiz one".to_string()]);

    let details: CourseJobDetails = deps.ledger.find(&token).await.unwrap().details_as().unwrap();
    let outline = details.course_structure.unwrap();
    assert_eq!(outline.modules[0].name, "Basics");
    let stamped = &outline.modules[0].concepts[0].tasks[0];
    assert_eq!(stamped.task_type, TaskType::Quiz);
    assert_eq!(stamped.description, "");
}

#[test_context(TestHarness)]
#[tokio::test]
async fn resume_skips_jobs_already_owned_by_this_instance(ctx: &TestHarness) {
    let course_id = ctx.create_course("Rust 101").await.unwrap();
    let token = ctx.start_course_job(course_id).await.unwrap();

    let report = resume_all(&ctx.deps).await.unwrap();

    assert_eq!(report.total(), 0);
    assert_eq!(ctx.mock.outline_calls(), 0);
    assert_eq!(ctx.deps.ledger.find(&token).await.unwrap().status, JobStatus::Started);
}

// =============================================================================
// Fan-out resumption
// =============================================================================

#[test_context(TestHarness)]
#[tokio::test]
async fn pending_job_without_children_is_dispatched(ctx: &TestHarness) {
    let course_id = ctx.create_course("Rust 101").await.unwrap();
    let token = outline_only(ctx, course_id).await;
    assert_eq!(ctx.deps.ledger.find(&token).await.unwrap().status, JobStatus::Pending);

    let (mock, deps) = ctx.restart();
    resume_all(&deps).await.unwrap();
    settle(&deps).await;

    assert_eq!(mock.task_calls().len(), 2);
    assert_eq!(deps.ledger.children_of(&token).await.unwrap().len(), 2);
    assert_eq!(deps.ledger.find(&token).await.unwrap().status, JobStatus::Completed);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn orphaned_task_jobs_are_rerun(ctx: &TestHarness) {
    let course_id = ctx.create_course("Rust 101").await.unwrap();
    let token = outline_only(ctx, course_id).await;
    let children = record_children(&ctx.deps, &token).await;
    ctx.deps
        .ledger
        .set_status(&children[0].token, JobStatus::Completed)
        .await
        .unwrap();

    let (mock, deps) = ctx.restart();
    let report = resume_all(&deps).await.unwrap();
    settle(&deps).await;

    // Only the unfinished task runs again
    assert_eq!(report.succeeded, 1);
    assert_eq!(mock.task_calls(), vec!["T2"]);
    assert_eq!(deps.ledger.find(&children[1].token).await.unwrap().status, JobStatus::Completed);
    assert_eq!(deps.ledger.find(&token).await.unwrap().status, JobStatus::Completed);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn settled_children_complete_the_parent(ctx: &TestHarness) {
    let course_id = ctx.create_course("Rust 101").await.unwrap();
    let token = outline_only(ctx, course_id).await;
    for child in record_children(&ctx.deps, &token).await {
        ctx.deps.ledger.set_status(&child.token, JobStatus::Failed).await.unwrap();
    }

    let (mock, deps) = ctx.restart();
    let report = resume_all(&deps).await.unwrap();
    settle(&deps).await;

    assert_eq!(report.total(), 0);
    assert!(mock.task_calls().is_empty());
    assert_eq!(deps.ledger.find(&token).await.unwrap().status, JobStatus::Completed);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn finished_jobs_are_left_alone(ctx: &TestHarness) {
    let course_id = ctx.create_course("Rust 101").await.unwrap();
    let token = ctx.start_course_job(course_id).await.unwrap();
    ctx.mock.script_outline(two_task_outline());
    run_course_structure(&token, &ctx.deps).await.unwrap();
    ctx.settle().await;

    let (mock, deps) = ctx.restart();
    let report = resume_all(&deps).await.unwrap();
    settle(&deps).await;

    assert_eq!(report.total(), 0);
    assert_eq!(mock.outline_calls(), 0);
    assert!(mock.task_calls().is_empty());
    assert_eq!(Task::list_for_course(course_id, &ctx.db_pool).await.unwrap().len(), 2);
}
