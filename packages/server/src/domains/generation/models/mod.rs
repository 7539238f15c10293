pub mod content;
pub mod cursor;
pub mod job_details;
pub mod outline;

pub use content::*;
pub use cursor::{Materialization, ModuleSlot, ProgressCursor, TaskSlot};
pub use job_details::{CourseJobDetails, TaskJobDetails};
pub use outline::*;
