// Courses domain - the content store generation materializes into
//
// Responsibilities:
// - Courses, modules (colour + ordering), tasks (draft/published)
// - Learning-material blocks and quiz questions

pub mod models;

pub use models::*;
