//! Kernel module - server infrastructure and dependencies.

pub mod background;
pub mod batch;
pub mod db;
pub mod deps;
pub mod jobs;
pub mod openai_generator;
pub mod progress_hub;
pub mod test_dependencies;
pub mod traits;

/// Default model for outline and content generation.
pub const DEFAULT_GENERATION_MODEL: &str = "gpt-4.1";

pub use background::BackgroundTasks;
pub use batch::{BatchReport, BatchRunner, BatchUnit, DEFAULT_CONCURRENCY};
pub use deps::{GenerationSettings, ServerDeps};
pub use jobs::{GenerationJob, JobError, JobKind, JobLedger, JobStatus, JobStatusCounts};
pub use openai_generator::OpenAIContentGenerator;
pub use progress_hub::ProgressHub;
pub use test_dependencies::{mock_generator, MockContentGenerator};
pub use traits::*;
