//! HTTP surface tests, driven through the router with `oneshot`.

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::common::{two_task_outline, TestHarness};
use coursegen_core::kernel::JobStatus;
use test_context::test_context;

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn structure_body(key: &str) -> Value {
    json!({
        "course_description": "An introduction to Rust",
        "intended_audience": "Backend developers",
        "reference_material_key": key,
    })
}

// =============================================================================
// Health / courses
// =============================================================================

#[test_context(TestHarness)]
#[tokio::test]
async fn health_reports_database_and_pool(ctx: &TestHarness) {
    let (status, body) = send(ctx.router(), get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"]["status"], "ok");
    assert_eq!(body["available_permits"], 25);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn courses_are_created_by_name(ctx: &TestHarness) {
    let (status, body) = send(ctx.router(), post_json("/courses", json!({"name": "Rust 101"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["id"].as_i64().unwrap() > 0);

    let (status, body) = send(ctx.router(), post_json("/courses", json!({"name": "  "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("name"));
}

// =============================================================================
// Generation
// =============================================================================

#[test_context(TestHarness)]
#[tokio::test]
async fn structure_request_runs_the_whole_pipeline(ctx: &TestHarness) {
    let course_id = ctx.create_course("Rust 101").await.unwrap();
    ctx.write_upload("notes.pdf", b"%PDF reference").await.unwrap();
    ctx.mock.script_outline(two_task_outline());

    let uri = format!("/generate/course/{}/structure", course_id);
    let (status, body) = send(ctx.router(), post_json(&uri, structure_body("notes.pdf"))).await;
    assert_eq!(status, StatusCode::OK);
    let token = body["job_uuid"].as_str().unwrap().to_string();

    ctx.settle().await;
    let job = ctx.deps.ledger.find(&token).await.unwrap();
    assert_eq!(job.owner.as_deref(), Some(ctx.deps.ledger.owner_id()));
    assert_eq!(ctx.mock.uploads(), vec!["notes.pdf"]);
    assert_eq!(
        ctx.mock.last_outline_request().unwrap().reference_material_id,
        "file-mock-1"
    );

    let (status, body) = send(ctx.router(), get(&format!("/jobs/{}", token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["kind"], "course_structure");
    assert_eq!(body["status"], "completed");
    assert_eq!(body["course_id"], course_id);
    assert_eq!(body["tasks"]["completed"], 2);
    assert!(body.get("parent_job_uuid").is_none());
}

#[test_context(TestHarness)]
#[tokio::test]
async fn structure_request_validates_its_input(ctx: &TestHarness) {
    let course_id = ctx.create_course("Rust 101").await.unwrap();
    let uri = format!("/generate/course/{}/structure", course_id);

    let (status, _) = send(ctx.router(), post_json(&uri, structure_body("../secrets"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(ctx.router(), post_json(&uri, structure_body("missing.pdf"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        ctx.router(),
        post_json("/generate/course/999/structure", structure_body("notes.pdf")),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    assert!(ctx.mock.uploads().is_empty());
    assert!(ctx.deps.ledger.list_incomplete_course_jobs().await.unwrap().is_empty());
}

#[test_context(TestHarness)]
#[tokio::test]
async fn task_request_requires_a_finished_outline(ctx: &TestHarness) {
    let course_id = ctx.create_course("Rust 101").await.unwrap();
    let token = ctx.start_course_job(course_id).await.unwrap();
    let uri = format!("/generate/course/{}/tasks", course_id);

    let (status, _) = send(ctx.router(), post_json(&uri, json!({"job_uuid": token}))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(ctx.router(), post_json(&uri, json!({"job_uuid": "nope"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let other = ctx.create_course("Other").await.unwrap();
    let (status, _) = send(
        ctx.router(),
        post_json(
            &format!("/generate/course/{}/tasks", other),
            json!({"job_uuid": token}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn task_request_fans_out_a_pending_job(ctx: &TestHarness) {
    let (mock, mut deps) = ctx.restart();
    deps.settings.auto_dispatch = false;

    let course_id = ctx.create_course("Rust 101").await.unwrap();
    let token = ctx.start_course_job(course_id).await.unwrap();
    mock.script_outline(two_task_outline());
    coursegen_core::domains::generation::run_course_structure(&token, &deps)
        .await
        .unwrap();

    let app = coursegen_core::server::build_app(deps.clone());
    let uri = format!("/generate/course/{}/tasks", course_id);
    let (status, body) = send(app, post_json(&uri, json!({"job_uuid": token}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    crate::common::settle(&deps).await;
    assert_eq!(deps.ledger.find(&token).await.unwrap().status, JobStatus::Completed);
    assert_eq!(mock.task_calls().len(), 2);
}

// =============================================================================
// Jobs / progress stream
// =============================================================================

#[test_context(TestHarness)]
#[tokio::test]
async fn unknown_jobs_are_404(ctx: &TestHarness) {
    let (status, body) = send(ctx.router(), get("/jobs/does-not-exist")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("does-not-exist"));
}

#[test_context(TestHarness)]
#[tokio::test]
async fn progress_stream_is_server_sent_events(ctx: &TestHarness) {
    let course_id = ctx.create_course("Rust 101").await.unwrap();

    let response = ctx
        .router()
        .oneshot(get(&format!("/course/{}/generation", course_id)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap();
    assert!(content_type.starts_with("text/event-stream"));
}
