// src/engine/failure.rs

//! Records of terminal task failures.

use std::fmt;
use std::sync::Arc;

use crate::task::Task;
use crate::types::Direction;

/// A task that exhausted its attempts, with the error of the last attempt.
///
/// The error keeps its full anyhow context chain: [`AbortedTask::narration`]
/// renders that chain as the story of nested operations that led to the
/// failure, outermost first.
#[derive(Clone)]
pub struct AbortedTask {
    task: Arc<dyn Task>,
    direction: Direction,
    attempts: u32,
    error: Arc<anyhow::Error>,
    traceback: String,
    narration: Vec<String>,
}

impl AbortedTask {
    pub fn new(task: Arc<dyn Task>, direction: Direction, attempts: u32, error: anyhow::Error) -> Self {
        let traceback = error.backtrace().to_string();
        let narration = error.chain().map(|cause| cause.to_string()).collect();
        Self {
            task,
            direction,
            attempts,
            error: Arc::new(error),
            traceback,
            narration,
        }
    }

    pub fn task(&self) -> &Arc<dyn Task> {
        &self.task
    }

    pub fn task_name(&self) -> &str {
        self.task.name()
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// The original error; downcast it to recover the concrete type.
    pub fn error(&self) -> &anyhow::Error {
        &self.error
    }

    /// Top-level error message.
    pub fn error_value(&self) -> String {
        self.error.to_string()
    }

    /// Message of the innermost cause.
    pub fn root_cause(&self) -> String {
        self.error.root_cause().to_string()
    }

    /// Captured backtrace; reads "disabled backtrace" unless `RUST_BACKTRACE`
    /// or `RUST_LIB_BACKTRACE` is set.
    pub fn traceback(&self) -> &str {
        &self.traceback
    }

    pub fn narration(&self) -> &[String] {
        &self.narration
    }
}

impl fmt::Debug for AbortedTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbortedTask")
            .field("task", &self.task.name())
            .field("direction", &self.direction)
            .field("attempts", &self.attempts)
            .field("narration", &self.narration)
            .finish()
    }
}

impl fmt::Display for AbortedTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "task '{}' failed to {} after {} attempt(s): {}",
            self.task.name(),
            self.direction,
            self.attempts,
            self.narration.join(": ")
        )
    }
}
