// src/exec/mod.rs

//! Task execution layer.
//!
//! - [`control`] holds [`TaskExecControl`], the per-traversal run state of one
//!   task.
//! - [`runner`] makes a single attempt at a task: start delay or retry
//!   backoff, the action itself, and classification of the result.

pub mod control;
pub mod runner;

pub use control::TaskExecControl;
pub use runner::{AttemptOutcome, TaskRunner};
