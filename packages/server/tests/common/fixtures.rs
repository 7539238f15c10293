//! Scripted outline emissions.
//!
//! Each helper returns the growing snapshots a streaming provider would
//! emit; the mock marks the last one final.

use serde_json::{json, Value};

/// One module, one concept, a learning material `T1` and a quiz `T2`.
pub fn two_task_outline() -> Vec<Value> {
    vec![
        json!({"modules": [{"name": "M1"}]}),
        json!({"modules": [{"name": "M1", "concepts": [
            {"name": "C1", "description": "Ownership", "tasks": [{"name": "T1"}]}
        ]}]}),
        json!({"modules": [{"name": "M1", "concepts": [
            {"name": "C1", "description": "Ownership", "tasks": [
                {"name": "T1", "type": "learning_material"}
            ]}
        ]}]}),
        json!({"modules": [{"name": "M1", "concepts": [
            {"name": "C1", "description": "Ownership", "tasks": [
                {"name": "T1", "description": "Explain moves", "type": "learning_material"},
                {"name": "T2", "description": "Check moves", "type": "quiz"}
            ]}
        ]}]}),
    ]
}

/// Two modules where the first is complete before the second starts.
pub fn two_module_outline() -> Vec<Value> {
    let first = json!({"name": "Basics", "concepts": [
        {"name": "Syntax", "description": "Syntax", "tasks": [
            {"name": "Variables", "type": "learning_material"},
            {"name": "Variables check", "type": "quiz"}
        ]}
    ]});
    vec![
        json!({"modules": [first.clone()]}),
        json!({"modules": [first.clone(), {"name": "Traits"}]}),
        json!({"modules": [first, {"name": "Traits", "concepts": [
            {"name": "Generics", "description": "Generics", "tasks": [
                {"name": "Bounds", "type": "learning_material"}
            ]}
        ]}]}),
    ]
}

/// A single concept with `count` learning-material tasks, emitted at once.
pub fn wide_outline(count: usize) -> Vec<Value> {
    let tasks: Vec<Value> = (0..count)
        .map(|i| json!({"name": format!("Lesson {}", i + 1), "type": "learning_material"}))
        .collect();
    vec![json!({"modules": [{"name": "Wide", "concepts": [
        {"name": "Everything", "description": "All of it", "tasks": tasks}
    ]}]})]
}

/// Everything already published on a progress subscription.
pub fn drain_events(rx: &mut tokio::sync::broadcast::Receiver<Value>) -> Vec<Value> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub fn event_names(events: &[Value]) -> Vec<String> {
    events
        .iter()
        .filter_map(|event| event["event"].as_str().map(str::to_string))
        .collect()
}
