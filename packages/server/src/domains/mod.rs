pub mod courses;
pub mod generation;
