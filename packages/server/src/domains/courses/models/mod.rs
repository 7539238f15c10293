pub mod course;
pub mod module;
pub mod question;
pub mod task;

pub use course::*;
pub use module::*;
pub use question::*;
pub use task::*;
