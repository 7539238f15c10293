// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic.
// Materializing outlines and persisting content are domain functions that use these traits.
//
// Naming convention: Base* for trait names (e.g., BaseContentGenerator)

use anyhow::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::domains::generation::models::{OutlineConcept, OutlineTask, PartialOutline, TaskContent};

// =============================================================================
// Content Generator Trait (Infrastructure - LLM provider)
// =============================================================================

/// Input for one streamed course outline.
#[derive(Debug, Clone)]
pub struct OutlineRequest {
    pub course_description: String,
    pub intended_audience: String,
    pub instructions: Option<String>,
    pub reference_material_id: String,
}

/// One emission of the outline stream. Each is a superset of the one before.
#[derive(Debug, Clone, PartialEq)]
pub struct OutlineSnapshot {
    pub outline: PartialOutline,
    /// The stream ended and `outline` is authoritative
    pub is_final: bool,
}

/// Input for the content of one task.
#[derive(Debug, Clone)]
pub struct TaskContentRequest {
    pub task: OutlineTask,
    pub concept: OutlineConcept,
    pub reference_material_id: String,
}

pub type OutlineStream = BoxStream<'static, Result<OutlineSnapshot>>;

#[async_trait]
pub trait BaseContentGenerator: Send + Sync {
    /// Upload a reference document; returns the provider's file handle.
    async fn upload_reference_material(&self, filename: &str, contents: Vec<u8>) -> Result<String>;

    /// Stream growing snapshots of a course outline. The last item has
    /// `is_final` set; an error item ends the stream.
    async fn stream_outline(&self, request: &OutlineRequest) -> Result<OutlineStream>;

    /// Generate the content of one task. The variant follows the task type.
    async fn generate_task_content(&self, request: &TaskContentRequest) -> Result<TaskContent>;
}
