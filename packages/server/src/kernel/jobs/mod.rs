//! Job infrastructure for generation work.
//!
//! - [`GenerationJob`] - one course-structure or task job row
//! - [`JobLedger`] - persistent record of jobs with CAS ownership
//!
//! # Lifecycle
//!
//! ```text
//! course job:  started ──► pending ──► completed
//!                 │           │
//!                 └───────────┴──► failed
//!
//! task job:    started ──► completed | failed
//! ```
//!
//! Typed views of the `details` document live with the generation domain.

mod job;
mod ledger;

pub use job::{GenerationJob, JobKind, JobStatus};
pub use ledger::{JobError, JobLedger, JobStatusCounts};
