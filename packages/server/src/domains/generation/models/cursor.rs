//! Progress cursor for streamed outline materialization.
//!
//! The cursor records, per module and per concept, which outline positions
//! have already been turned into rows. It is serialized into the course job
//! details after every materialization, so a resumed run restarts from the
//! same point and never creates a module or task twice.
//!
//! Planning is pure: [`ProgressCursor::plan`] looks at one emission and
//! returns the steps to execute; [`ProgressCursor::apply`] records each step
//! once its row exists.

use serde::{Deserialize, Serialize};

use super::outline::{
    CourseOutline, OutlineConcept, OutlineModule, OutlineTask, PartialConcept, PartialOutline,
    TaskType,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressCursor {
    pub modules: Vec<ModuleSlot>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleSlot {
    /// `None` when the module was skipped
    pub id: Option<i64>,
    /// Name the row was created with
    #[serde(default)]
    pub name: String,
    /// Task slots per concept index
    #[serde(default)]
    pub concepts: Vec<Vec<TaskSlot>>,
}

/// What a task position became. Materialized slots keep the name and type
/// the row was created with, since a resumed stream may emit a different
/// task at the same position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskSlot {
    Materialized {
        id: i64,
        name: String,
        #[serde(rename = "type")]
        task_type: TaskType,
    },
    /// Superseded before it ever became eligible
    Skipped,
}

/// One step of a materialization plan.
#[derive(Debug, Clone, PartialEq)]
pub enum Materialization {
    Module {
        index: usize,
        name: String,
    },
    SkipModule {
        index: usize,
    },
    Task {
        module_index: usize,
        concept_index: usize,
        task_index: usize,
        name: String,
        task_type: TaskType,
    },
    SkipTask {
        module_index: usize,
        concept_index: usize,
        task_index: usize,
    },
}

impl Materialization {
    /// Whether executing the step creates a row.
    pub fn creates_row(&self) -> bool {
        matches!(self, Materialization::Module { .. } | Materialization::Task { .. })
    }
}

enum ModuleState {
    Known,
    Skipped,
}

impl ProgressCursor {
    /// Steps needed to bring the store up to `emission`.
    ///
    /// An unmaterialized entity that is not yet eligible is skipped when a
    /// later sibling already exists (or the stream ended); otherwise planning
    /// stops there and waits for the next emission.
    pub fn plan(&self, emission: &PartialOutline, is_final: bool) -> Vec<Materialization> {
        let mut steps = Vec::new();
        let module_count = emission.modules.len();

        for (module_index, module) in emission.modules.iter().enumerate() {
            let module_closed = is_final || module_index + 1 < module_count;
            let slot = self.modules.get(module_index);

            let state = match slot {
                Some(slot) if slot.id.is_some() => ModuleState::Known,
                Some(_) => ModuleState::Skipped,
                None if module.is_eligible() => {
                    steps.push(Materialization::Module {
                        index: module_index,
                        name: module.name.clone().unwrap_or_default(),
                    });
                    ModuleState::Known
                }
                None if module_closed => {
                    steps.push(Materialization::SkipModule {
                        index: module_index,
                    });
                    ModuleState::Skipped
                }
                None => return steps,
            };

            if matches!(state, ModuleState::Skipped) {
                continue;
            }

            let concept_count = module.concepts.len();
            for (concept_index, concept) in module.concepts.iter().enumerate() {
                let concept_closed = module_closed || concept_index + 1 < concept_count;
                let done = slot
                    .and_then(|slot| slot.concepts.get(concept_index))
                    .map(Vec::len)
                    .unwrap_or(0);
                let task_count = concept.tasks.len();

                for (task_index, task) in concept.tasks.iter().enumerate().skip(done) {
                    let task_closed = concept_closed || task_index + 1 < task_count;

                    match task.parsed_type() {
                        Some(task_type) if task.is_eligible() => {
                            steps.push(Materialization::Task {
                                module_index,
                                concept_index,
                                task_index,
                                name: task.name.clone().unwrap_or_default(),
                                task_type,
                            });
                        }
                        _ if task_closed => steps.push(Materialization::SkipTask {
                            module_index,
                            concept_index,
                            task_index,
                        }),
                        _ => return steps,
                    }
                }
            }
        }

        steps
    }

    /// Record a step. `id` is the new row id for steps that create one.
    pub fn apply(&mut self, step: &Materialization, id: Option<i64>) {
        match step {
            Materialization::Module { index, name } => {
                let slot = self.module_slot(*index);
                slot.id = id;
                slot.name = name.clone();
            }
            Materialization::SkipModule { index } => self.module_slot(*index).id = None,
            Materialization::Task {
                module_index,
                concept_index,
                task_index,
                name,
                task_type,
            } => {
                let slot = match id {
                    Some(id) => TaskSlot::Materialized {
                        id,
                        name: name.clone(),
                        task_type: *task_type,
                    },
                    None => TaskSlot::Skipped,
                };
                self.set_task(*module_index, *concept_index, *task_index, slot);
            }
            Materialization::SkipTask {
                module_index,
                concept_index,
                task_index,
            } => self.set_task(*module_index, *concept_index, *task_index, TaskSlot::Skipped),
        }
    }

    /// Id of the module at `index`, if it was materialized.
    pub fn module_id(&self, index: usize) -> Option<i64> {
        self.modules.get(index).and_then(|slot| slot.id)
    }

    /// Build the stamped outline from the materialized rows.
    ///
    /// Ids, names and task types come from the cursor, so rows created by an
    /// earlier run keep what they were created with. `last` only contributes
    /// concept text and the descriptions of tasks it still agrees with.
    /// Skipped entities are left out.
    pub fn finalize(&self, last: &PartialOutline) -> CourseOutline {
        let modules = self
            .modules
            .iter()
            .enumerate()
            .filter_map(|(module_index, slot)| {
                let id = slot.id?;
                let emitted = last.modules.get(module_index);
                let concept_count = slot
                    .concepts
                    .len()
                    .max(emitted.map_or(0, |module| module.concepts.len()));

                let concepts = (0..concept_count)
                    .map(|concept_index| {
                        let concept = emitted.and_then(|module| module.concepts.get(concept_index));
                        let tasks = slot
                            .concepts
                            .get(concept_index)
                            .map(|tasks| stamp_tasks(tasks, concept))
                            .unwrap_or_default();

                        OutlineConcept {
                            name: concept.and_then(|c| c.name.clone()).unwrap_or_default(),
                            description: concept
                                .and_then(|c| c.description.clone())
                                .unwrap_or_default(),
                            tasks,
                        }
                    })
                    .collect();

                Some(OutlineModule {
                    id,
                    name: slot.name.clone(),
                    concepts,
                })
            })
            .collect();

        CourseOutline { modules }
    }

    fn module_slot(&mut self, index: usize) -> &mut ModuleSlot {
        if self.modules.len() <= index {
            self.modules.resize_with(index + 1, ModuleSlot::default);
        }
        &mut self.modules[index]
    }

    fn set_task(&mut self, module_index: usize, concept_index: usize, task_index: usize, value: TaskSlot) {
        let module = self.module_slot(module_index);
        if module.concepts.len() <= concept_index {
            module.concepts.resize_with(concept_index + 1, Vec::new);
        }
        let tasks = &mut module.concepts[concept_index];
        if tasks.len() <= task_index {
            tasks.resize(task_index + 1, TaskSlot::Skipped);
        }
        tasks[task_index] = value;
    }
}

fn stamp_tasks(slots: &[TaskSlot], concept: Option<&PartialConcept>) -> Vec<OutlineTask> {
    slots
        .iter()
        .enumerate()
        .filter_map(|(task_index, slot)| {
            let TaskSlot::Materialized { id, name, task_type } = slot else {
                return None;
            };
            let description = concept
                .and_then(|c| c.tasks.get(task_index))
                .filter(|task| task.name.as_deref() == Some(name.as_str()))
                .filter(|task| task.parsed_type() == Some(*task_type))
                .and_then(|task| task.description.clone())
                .unwrap_or_default();

            Some(OutlineTask {
                id: *id,
                name: name.clone(),
                description,
                task_type: *task_type,
            })
        })
        .collect()
}
