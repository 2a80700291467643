// src/types.rs

//! Small shared value types: task identity, status enums and traversal
//! direction.

use std::fmt;

use uuid::Uuid;

/// Stable identity of a task instance.
///
/// A fresh id is minted whenever a task is created or cloned, so two copies of
/// the same template never collide inside one graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(Uuid);

impl TaskId {
    pub fn new() -> Self {
        TaskId(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form is enough to tell tasks apart in logs.
        let s = self.0.simple().to_string();
        f.write_str(&s[..8])
    }
}

/// Long-lived status of a task, surviving across traversals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PerformanceStatus {
    #[default]
    Unstarted,
    Performed,
    Reversed,
}

/// Status of one queue entry (a [`crate::exec::TaskExecControl`]) during a
/// single traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecStatus {
    #[default]
    Unperformed,
    Performing,
    Success,
    /// Failed, but attempts remain; the control is re-queued.
    FailRetry,
    /// Failed on the last permitted attempt.
    FailFinal,
    /// Gave up because the traversal was stopped while waiting.
    Abort,
}

/// Which way a traversal walks the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Dependency order, calling `perform`.
    Perform,
    /// Reverse dependency order, calling `reverse`.
    Reverse,
}

impl Direction {
    /// The performance status a task ends up in after a successful action in
    /// this direction.
    pub fn target_status(self) -> PerformanceStatus {
        match self {
            Direction::Perform => PerformanceStatus::Performed,
            Direction::Reverse => PerformanceStatus::Reversed,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Perform => f.write_str("perform"),
            Direction::Reverse => f.write_str("reverse"),
        }
    }
}
