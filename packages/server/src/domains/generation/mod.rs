// Generation domain - AI course generation pipeline
//
// Responsibilities:
// - Streaming course outlines and materializing modules/tasks as they appear
// - Fan-out of per-task content generation under bounded concurrency
// - Progress events for subscribed clients
// - Resuming unfinished jobs after a restart

pub mod activities;
pub mod events;
pub mod models;
pub mod prompts;

pub use activities::*;
pub use events::CourseEvent;
