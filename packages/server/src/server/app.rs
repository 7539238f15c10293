//! Application setup and router configuration.

use axum::{
    extract::Extension,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::kernel::ServerDeps;
use crate::server::routes::{
    create_course_handler, generate_structure_handler, generate_tasks_handler,
    generation_stream_handler, health_handler, job_handler,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub deps: ServerDeps,
}

/// Build the Axum application router
pub fn build_app(deps: ServerDeps) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/courses", post(create_course_handler))
        .route(
            "/generate/course/:course_id/structure",
            post(generate_structure_handler),
        )
        .route(
            "/generate/course/:course_id/tasks",
            post(generate_tasks_handler),
        )
        .route("/jobs/:token", get(job_handler))
        .route(
            "/course/:course_id/generation",
            get(generation_stream_handler),
        )
        .layer(Extension(AppState { deps }))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
