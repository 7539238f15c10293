// Course Generation - Server Core
//
// This crate provides the backend for AI-assisted course generation:
// streamed course outlines, fan-out of per-task content, live progress
// and resumption of unfinished jobs after a restart.
//
// Domain logic lives in domains/*/activities; infrastructure in kernel/.

pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;
