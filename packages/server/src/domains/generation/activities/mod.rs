//! Generation domain activities - entry-point business logic
//!
//! Called from HTTP routes, the background supervisor and startup resumption.

pub mod course_structure;
pub mod dispatch;
pub mod requests;
pub mod resume;
pub mod task_content;

pub use course_structure::run_course_structure;
pub use dispatch::{dispatch, dispatch_detached};
pub use requests::{
    request_course_structure, request_task_generation, CourseStructureRequest, RequestError,
};
pub use resume::resume_all;
pub use task_content::{complete_parent_if_settled, run_task_content, ContentError};
