//! Test harness over an in-memory SQLite database.
//!
//! Every test gets a fresh migrated database, a scripted content generator
//! and a full set of generation dependencies. `restart` builds a second
//! process instance over the same database to exercise resumption.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use sqlx::SqlitePool;
use test_context::AsyncTestContext;
use uuid::Uuid;

use coursegen_core::domains::courses::models::Course;
use coursegen_core::domains::generation::models::CourseJobDetails;
use coursegen_core::kernel::{
    db, mock_generator, GenerationJob, GenerationSettings, JobStatus, MockContentGenerator,
    ServerDeps, DEFAULT_CONCURRENCY,
};
use coursegen_core::server::build_app;

/// Test harness providing a migrated database and scripted generator.
pub struct TestHarness {
    pub db_pool: SqlitePool,
    pub mock: Arc<MockContentGenerator>,
    pub deps: ServerDeps,
    pub upload_folder: PathBuf,
}

impl AsyncTestContext for TestHarness {
    async fn setup() -> Self {
        Self::new().await.expect("Failed to create test harness")
    }

    async fn teardown(self) {
        let _ = tokio::fs::remove_dir_all(&self.upload_folder).await;
    }
}

impl TestHarness {
    /// Create a new harness with the default pool size.
    pub async fn new() -> Result<Self> {
        Self::with_concurrency(DEFAULT_CONCURRENCY).await
    }

    pub async fn with_concurrency(concurrency: usize) -> Result<Self> {
        // Run tests with: RUST_LOG=debug cargo test -- --nocapture
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let db_pool = db::connect_in_memory().await?;
        db::migrate(&db_pool).await?;

        let upload_folder = std::env::temp_dir().join(format!("coursegen-test-{}", Uuid::new_v4()));
        tokio::fs::create_dir_all(&upload_folder)
            .await
            .context("Failed to create upload folder")?;

        let (mock, generator) = mock_generator();
        let deps = ServerDeps::new(
            db_pool.clone(),
            generator,
            concurrency,
            GenerationSettings {
                auto_dispatch: true,
                upload_folder: upload_folder.clone(),
            },
        );

        Ok(Self {
            db_pool,
            mock,
            deps,
            upload_folder,
        })
    }

    /// A second process instance over the same database: new ledger owner,
    /// fresh progress hub and a fresh scripted generator.
    pub fn restart(&self) -> (Arc<MockContentGenerator>, ServerDeps) {
        let (mock, generator) = mock_generator();
        let deps = ServerDeps::new(
            self.db_pool.clone(),
            generator,
            self.deps.batch.capacity(),
            self.deps.settings.clone(),
        );
        (mock, deps)
    }

    pub fn router(&self) -> Router {
        build_app(self.deps.clone())
    }

    pub async fn create_course(&self, name: &str) -> Result<i64> {
        Ok(Course::create(name, &self.db_pool).await?.id)
    }

    /// Record a course job owned by this instance without starting it.
    pub async fn start_course_job(&self, course_id: i64) -> Result<String> {
        let details = CourseJobDetails {
            course_description: "An introduction to Rust".to_string(),
            intended_audience: "Backend developers".to_string(),
            reference_material_id: "file-test".to_string(),
            ..Default::default()
        };
        let job = self
            .deps
            .ledger
            .create(GenerationJob::course_structure(course_id, &details)?)
            .await?;
        self.deps
            .ledger
            .claim(&job.token, JobStatus::Started, JobStatus::Started)
            .await?;
        Ok(job.token)
    }

    pub async fn write_upload(&self, key: &str, contents: &[u8]) -> Result<()> {
        tokio::fs::write(self.upload_folder.join(key), contents).await?;
        Ok(())
    }

    /// Wait until every detached run and fan-out of this instance finished.
    pub async fn settle(&self) {
        settle(&self.deps).await
    }
}

/// Wait for the background work of `deps`, bounded so a hang fails the test.
pub async fn settle(deps: &ServerDeps) {
    tokio::time::timeout(Duration::from_secs(30), deps.background.wait_idle())
        .await
        .expect("background generation work did not settle");
}
