//! Server dependencies for generation work (using traits for testability)
//!
//! This module provides the central dependency container used by every
//! generation activity. The content provider sits behind a trait so tests
//! can script it.

use std::path::PathBuf;
use std::sync::Arc;

use sqlx::SqlitePool;

use crate::kernel::{BackgroundTasks, BaseContentGenerator, BatchRunner, JobLedger, ProgressHub};

/// Tunables of the generation pipeline.
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    /// Start fan-out as soon as a course outline completes
    pub auto_dispatch: bool,
    /// Directory reference material keys are resolved against
    pub upload_folder: PathBuf,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            auto_dispatch: true,
            upload_folder: PathBuf::from("uploads"),
        }
    }
}

// =============================================================================
// ServerDeps
// =============================================================================

/// Dependencies accessible to generation activities
#[derive(Clone)]
pub struct ServerDeps {
    pub db_pool: SqlitePool,
    pub ledger: JobLedger,
    pub generator: Arc<dyn BaseContentGenerator>,
    /// In-process pub/sub hub for course progress (SSE)
    pub progress: ProgressHub,
    /// Shared permit pool every generation unit runs under
    pub batch: BatchRunner,
    /// Supervisor for detached runs and fan-outs
    pub background: BackgroundTasks,
    pub settings: GenerationSettings,
}

impl ServerDeps {
    /// Create new ServerDeps with a fresh ledger owner id.
    pub fn new(
        db_pool: SqlitePool,
        generator: Arc<dyn BaseContentGenerator>,
        concurrency: usize,
        settings: GenerationSettings,
    ) -> Self {
        Self {
            ledger: JobLedger::new(db_pool.clone()),
            db_pool,
            generator,
            progress: ProgressHub::new(),
            batch: BatchRunner::new(concurrency),
            background: BackgroundTasks::new(),
            settings,
        }
    }
}
