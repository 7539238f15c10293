//! Progress events pushed to course subscribers.
//!
//! Serialized as flat JSON objects tagged by `event`, e.g.
//! `{"event": "task_completed", "task": {"id": 4}, "total_completed": 2}`.

use serde::{Deserialize, Serialize};

use crate::domains::courses::models::{Module, Task, TaskType};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CourseEvent {
    ModuleCreated { module: ModuleSummary },
    TaskCreated { task: TaskSummary },
    TaskCompleted { task: TaskRef, total_completed: i64 },
    TaskFailed { task: TaskRef, error: String },
    CourseStructureCompleted { job_id: String },
    CourseStructureFailed { job_id: String, error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleSummary {
    pub id: i64,
    pub name: String,
    pub color: String,
    pub ordering: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSummary {
    pub id: i64,
    pub module_id: i64,
    pub ordering: i64,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRef {
    pub id: i64,
}

impl CourseEvent {
    /// Value of the `event` tag.
    pub fn name(&self) -> &'static str {
        match self {
            CourseEvent::ModuleCreated { .. } => "module_created",
            CourseEvent::TaskCreated { .. } => "task_created",
            CourseEvent::TaskCompleted { .. } => "task_completed",
            CourseEvent::TaskFailed { .. } => "task_failed",
            CourseEvent::CourseStructureCompleted { .. } => "course_structure_completed",
            CourseEvent::CourseStructureFailed { .. } => "course_structure_failed",
        }
    }

    pub fn module_created(module: &Module) -> Self {
        CourseEvent::ModuleCreated {
            module: ModuleSummary {
                id: module.id,
                name: module.name.clone(),
                color: module.color.clone(),
                ordering: module.ordering,
            },
        }
    }

    pub fn task_created(task: &Task) -> Self {
        CourseEvent::TaskCreated {
            task: TaskSummary {
                id: task.id,
                module_id: task.module_id,
                ordering: task.ordering,
                task_type: task.task_type,
                name: task.name.clone(),
            },
        }
    }
}
