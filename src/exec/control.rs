// src/exec/control.rs

//! Run-state record for one task during one traversal.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use crate::task::Task;
use crate::types::ExecStatus;

/// Wraps a task while it sits in the work queue or in a worker's hands.
///
/// Exactly one control exists per task per traversal, and it is moved (never
/// shared) between the queue and workers, so its fields need no locking.
/// A retry re-queues the same control so `try_count` and `fail_time` carry
/// over to the next attempt.
pub struct TaskExecControl {
    task: Arc<dyn Task>,
    pub(crate) status: ExecStatus,
    pub(crate) try_count: u32,
    pub(crate) fail_time: Option<Instant>,
}

impl TaskExecControl {
    pub fn new(task: Arc<dyn Task>) -> Self {
        Self {
            task,
            status: ExecStatus::Unperformed,
            try_count: 0,
            fail_time: None,
        }
    }

    pub fn task(&self) -> &Arc<dyn Task> {
        &self.task
    }

    pub fn status(&self) -> ExecStatus {
        self.status
    }

    /// Attempts started so far.
    pub fn try_count(&self) -> u32 {
        self.try_count
    }

    pub fn fail_time(&self) -> Option<Instant> {
        self.fail_time
    }

    /// Earliest instant the next attempt may begin, if a backoff applies.
    pub fn retry_deadline(&self) -> Option<Instant> {
        if self.status != ExecStatus::FailRetry {
            return None;
        }
        let failed_at = self.fail_time?;
        let wait = self.task.repeat_policy().backoff_after(self.try_count);
        Some(failed_at + wait)
    }

    /// Whether another failure would still leave attempts to spare.
    pub fn has_attempts_left(&self) -> bool {
        self.try_count < self.task.repeat_policy().max_attempts()
    }
}

impl fmt::Debug for TaskExecControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskExecControl")
            .field("task", &self.task.name())
            .field("status", &self.status)
            .field("try_count", &self.try_count)
            .field("fail_time", &self.fail_time)
            .finish()
    }
}
