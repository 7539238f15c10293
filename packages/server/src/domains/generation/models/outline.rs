//! Course outline shapes: the strict provider schema, the tolerant partial
//! view used while streaming, and the stamped outline stored on the job.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub use crate::domains::courses::models::TaskType;

// =============================================================================
// Provider schema
// =============================================================================

/// Course structure as requested from the provider.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[schemars(rename = "course_outline")]
pub struct OutlineDraft {
    /// The modules of the course, in teaching order
    pub modules: Vec<ModuleDraft>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ModuleDraft {
    /// The name of the module
    pub name: String,
    /// The concepts covered by the module, in order
    pub concepts: Vec<ConceptDraft>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ConceptDraft {
    /// The name of the concept
    pub name: String,
    /// What the concept is about
    pub description: String,
    /// The tasks for the concept, in order
    pub tasks: Vec<TaskDraft>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct TaskDraft {
    /// The name of the task, without its type
    pub name: String,
    /// A detailed description of what the content of the task should be
    pub description: String,
    /// The type of task
    #[serde(rename = "type")]
    pub task_type: TaskType,
}

// =============================================================================
// Partial view
// =============================================================================

/// An outline snapshot taken mid-stream. Anything may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialOutline {
    #[serde(default)]
    pub modules: Vec<PartialModule>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialModule {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub concepts: Vec<PartialConcept>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialConcept {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tasks: Vec<PartialTask>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialTask {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Kept as text so an unknown tag does not invalidate the whole snapshot
    #[serde(rename = "type", default)]
    pub task_type: Option<String>,
}

impl PartialModule {
    /// A module is materialized once it has a name and at least one concept.
    pub fn is_eligible(&self) -> bool {
        has_text(&self.name) && !self.concepts.is_empty()
    }
}

impl PartialTask {
    pub fn parsed_type(&self) -> Option<TaskType> {
        self.task_type.as_deref().and_then(TaskType::parse)
    }

    /// A task is materialized once it has a name and a valid type tag.
    pub fn is_eligible(&self) -> bool {
        has_text(&self.name) && self.parsed_type().is_some()
    }
}

fn has_text(value: &Option<String>) -> bool {
    value.as_deref().map(|s| !s.trim().is_empty()).unwrap_or(false)
}

// =============================================================================
// Stamped outline
// =============================================================================

/// Final outline with the durable ids of materialized modules and tasks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CourseOutline {
    pub modules: Vec<OutlineModule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlineModule {
    pub id: i64,
    pub name: String,
    pub concepts: Vec<OutlineConcept>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlineConcept {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub tasks: Vec<OutlineTask>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlineTask {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub task_type: TaskType,
}

impl CourseOutline {
    /// Every leaf task with the concept it belongs to, in outline order.
    pub fn leaf_tasks(&self) -> impl Iterator<Item = (&OutlineConcept, &OutlineTask)> {
        self.modules
            .iter()
            .flat_map(|module| module.concepts.iter())
            .flat_map(|concept| concept.tasks.iter().map(move |task| (concept, task)))
    }

    pub fn task_count(&self) -> usize {
        self.leaf_tasks().count()
    }
}
