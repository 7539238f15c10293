// TestDependencies - mock implementations for testing
//
// Provides a scripted content generator that can be injected into ServerDeps for tests.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use super::traits::{
    BaseContentGenerator, OutlineRequest, OutlineSnapshot, OutlineStream, TaskContentRequest,
};
use crate::domains::generation::models::{
    Block, LearningMaterial, PartialOutline, Question, QuestionType, Quiz, TaskContent, TaskType,
};

// =============================================================================
// Mock Content Generator
// =============================================================================

#[derive(Default)]
struct MockState {
    outline: Vec<Value>,
    outline_error: Option<String>,
    stall_outline: bool,
    failing_tasks: HashSet<String>,
    panicking_tasks: HashSet<String>,
    mismatched_tasks: HashSet<String>,
    task_delay: Duration,
    outline_calls: Vec<OutlineRequest>,
    task_calls: Vec<String>,
    uploads: Vec<String>,
}

/// Content generator that replays scripted outline emissions and
/// produces canned content per task.
#[derive(Default)]
pub struct MockContentGenerator {
    state: Mutex<MockState>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

/// Decrements the in-flight gauge when a task call ends, panics included.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MockContentGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Outline emissions to replay, oldest first. The last one is final.
    pub fn script_outline(&self, emissions: Vec<Value>) {
        let mut state = self.state();
        state.outline = emissions;
        state.outline_error = None;
        state.stall_outline = false;
    }

    /// Replay `emissions`, then end the stream with a provider error.
    pub fn script_outline_failure(&self, emissions: Vec<Value>, message: &str) {
        let mut state = self.state();
        state.outline = emissions;
        state.outline_error = Some(message.to_string());
        state.stall_outline = false;
    }

    /// Replay `emissions`, then never finish (simulates a crash mid-stream
    /// when the worker is aborted).
    pub fn script_outline_stall(&self, emissions: Vec<Value>) {
        let mut state = self.state();
        state.outline = emissions;
        state.outline_error = None;
        state.stall_outline = true;
    }

    pub fn fail_task(&self, name: &str) {
        self.state().failing_tasks.insert(name.to_string());
    }

    pub fn panic_on_task(&self, name: &str) {
        self.state().panicking_tasks.insert(name.to_string());
    }

    /// Return content of the wrong variant for `name`.
    pub fn mismatch_task(&self, name: &str) {
        self.state().mismatched_tasks.insert(name.to_string());
    }

    pub fn set_task_delay(&self, delay: Duration) {
        self.state().task_delay = delay;
    }

    pub fn outline_calls(&self) -> usize {
        self.state().outline_calls.len()
    }

    pub fn last_outline_request(&self) -> Option<OutlineRequest> {
        self.state().outline_calls.last().cloned()
    }

    /// Names of tasks content was requested for, in call order.
    pub fn task_calls(&self) -> Vec<String> {
        self.state().task_calls.clone()
    }

    pub fn uploads(&self) -> Vec<String> {
        self.state().uploads.clone()
    }

    /// Highest number of concurrent task calls observed.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn canned_content(name: &str, task_type: TaskType) -> TaskContent {
        match task_type {
            TaskType::LearningMaterial => TaskContent::LearningMaterial(LearningMaterial {
                blocks: vec![Block::paragraph(format!("Generated material for {}", name))],
            }),
            TaskType::Quiz => TaskContent::Quiz(Quiz {
                questions: vec![Question {
                    question_type: QuestionType::Objective,
                    answer_type: None,
                    coding_languages: None,
                    blocks: vec![Block::paragraph(format!("Question about {}", name))],
                    correct_answer: Some(vec![Block::paragraph("42")]),
                    scorecard: None,
                    context: Vec::new(),
                }],
            }),
        }
    }
}

#[async_trait]
impl BaseContentGenerator for MockContentGenerator {
    async fn upload_reference_material(&self, filename: &str, _contents: Vec<u8>) -> Result<String> {
        let mut state = self.state();
        state.uploads.push(filename.to_string());
        Ok(format!("file-mock-{}", state.uploads.len()))
    }

    async fn stream_outline(&self, request: &OutlineRequest) -> Result<OutlineStream> {
        let (emissions, error, stall) = {
            let mut state = self.state();
            state.outline_calls.push(request.clone());
            (state.outline.clone(), state.outline_error.clone(), state.stall_outline)
        };

        let last = emissions.len().saturating_sub(1);
        let ends_cleanly = error.is_none() && !stall;
        let mut items = Vec::with_capacity(emissions.len() + 1);
        for (index, emission) in emissions.into_iter().enumerate() {
            let outline: PartialOutline = serde_json::from_value(emission)?;
            items.push(Ok(OutlineSnapshot {
                outline,
                is_final: ends_cleanly && index == last,
            }));
        }
        if let Some(message) = error {
            items.push(Err(anyhow!(message)));
        }

        let replay = stream::iter(items);
        if stall {
            Ok(replay.chain(stream::pending()).boxed())
        } else {
            Ok(replay.boxed())
        }
    }

    async fn generate_task_content(&self, request: &TaskContentRequest) -> Result<TaskContent> {
        let name = request.task.name.clone();
        let (delay, fails, panics, mismatched) = {
            let mut state = self.state();
            state.task_calls.push(name.clone());
            (
                state.task_delay,
                state.failing_tasks.contains(&name),
                state.panicking_tasks.contains(&name),
                state.mismatched_tasks.contains(&name),
            )
        };

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _in_flight = InFlight(&self.in_flight);

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if panics {
            panic!("scripted panic for task {}", name);
        }
        if fails {
            return Err(anyhow!("scripted provider failure for task {}", name));
        }

        let task_type = match (request.task.task_type, mismatched) {
            (TaskType::LearningMaterial, true) => TaskType::Quiz,
            (TaskType::Quiz, true) => TaskType::LearningMaterial,
            (task_type, false) => task_type,
        };
        Ok(Self::canned_content(&name, task_type))
    }
}

/// Shared handle to a mock, usable both as the injected trait object and
/// for assertions.
pub fn mock_generator() -> (Arc<MockContentGenerator>, Arc<dyn BaseContentGenerator>) {
    let mock = Arc::new(MockContentGenerator::new());
    let generator: Arc<dyn BaseContentGenerator> = mock.clone();
    (mock, generator)
}
