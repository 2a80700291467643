// src/task/mod.rs

//! The task abstraction the engine schedules.
//!
//! A task is anything implementing [`Task`]: it embeds a [`TaskCore`] (identity,
//! name, bound role, repeat policy and performance status) and provides a
//! `perform` action plus an optional `reverse` action.
//!
//! - [`command`] provides [`CommandTask`], a task that runs shell commands.

pub mod command;

use std::fmt;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crate::engine::abort::StopSignal;
use crate::types::{Direction, PerformanceStatus, TaskId};

pub use command::{CommandError, CommandTask};

/// Retry configuration of a task, resolved to concrete values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepeatPolicy {
    /// Descriptive flag carried from the model; the attempt limit is
    /// `repeat_count` alone.
    pub repeat_til_success: bool,
    /// Maximum number of attempts (>= 1).
    pub repeat_count: u32,
    /// Linear backoff unit between attempts.
    pub repeat_interval: Duration,
}

impl RepeatPolicy {
    /// A single attempt, no retries.
    pub fn once() -> Self {
        Self {
            repeat_til_success: false,
            repeat_count: 1,
            repeat_interval: Duration::ZERO,
        }
    }

    /// Up to `count` attempts with a linear backoff of `interval` per
    /// previous attempt.
    pub fn until_success(count: u32, interval: Duration) -> Self {
        Self {
            repeat_til_success: true,
            repeat_count: count.max(1),
            repeat_interval: interval,
        }
    }

    /// Effective attempt limit.
    pub fn max_attempts(&self) -> u32 {
        self.repeat_count.max(1)
    }

    /// Delay between the most recent failure and the next attempt, given how
    /// many attempts have already been made.
    pub fn backoff_after(&self, attempts_made: u32) -> Duration {
        self.repeat_interval.saturating_mul(attempts_made)
    }
}

impl Default for RepeatPolicy {
    fn default() -> Self {
        Self::once()
    }
}

/// State every task carries, independent of what its action does.
///
/// Cloning a `TaskCore` yields an independent copy with a fresh [`TaskId`]
/// and an `Unstarted` status; name, role and repeat policy are kept.
pub struct TaskCore {
    id: TaskId,
    name: String,
    role: Option<String>,
    repeat: RepeatPolicy,
    status: Mutex<PerformanceStatus>,
}

impl TaskCore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: TaskId::new(),
            name: name.into(),
            role: None,
            repeat: RepeatPolicy::once(),
            status: Mutex::new(PerformanceStatus::Unstarted),
        }
    }

    pub fn with_repeat(mut self, repeat: RepeatPolicy) -> Self {
        self.repeat = repeat;
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> Option<&str> {
        self.role.as_deref()
    }

    pub fn repeat(&self) -> RepeatPolicy {
        self.repeat
    }

    pub fn status(&self) -> PerformanceStatus {
        *self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_status(&self, status: PerformanceStatus) {
        *self.status.lock().unwrap_or_else(PoisonError::into_inner) = status;
    }

    /// Bind this (freshly cloned) task to a target role, renaming it to
    /// `name@role`.
    pub fn bind_role(&mut self, role: &str) {
        self.name = format!("{}@{}", self.name, role);
        self.role = Some(role.to_string());
    }
}

impl Clone for TaskCore {
    fn clone(&self) -> Self {
        Self {
            id: TaskId::new(),
            name: self.name.clone(),
            role: self.role.clone(),
            repeat: self.repeat,
            status: Mutex::new(PerformanceStatus::Unstarted),
        }
    }
}

impl fmt::Debug for TaskCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskCore")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("role", &self.role)
            .field("repeat", &self.repeat)
            .field("status", &self.status())
            .finish()
    }
}

/// What a task action can see of the traversal running it.
pub struct TaskContext<'a> {
    direction: Direction,
    attempt: u32,
    stop: &'a StopSignal,
}

impl<'a> TaskContext<'a> {
    pub(crate) fn new(direction: Direction, attempt: u32, stop: &'a StopSignal) -> Self {
        Self {
            direction,
            attempt,
            stop,
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// 1-based attempt number of the current call.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Whether the engine has been asked to stop. Long-running actions may
    /// poll this to bail out early; the engine never interrupts them.
    pub fn stop_requested(&self) -> bool {
        self.stop.is_stopped()
    }
}

/// Boxed cloning for trait objects; implemented for every `Task + Clone`.
pub trait CloneTask {
    fn clone_boxed(&self) -> Box<dyn Task>;
}

impl<T> CloneTask for T
where
    T: Task + Clone + 'static,
{
    fn clone_boxed(&self) -> Box<dyn Task> {
        Box::new(self.clone())
    }
}

/// A unit of work the engine can perform and reverse.
///
/// After an action succeeds the engine records the new performance status;
/// a traversal never calls `perform` on a task that is already `Performed`,
/// nor `reverse` on one that is already `Reversed`.
pub trait Task: CloneTask + Send + Sync {
    fn core(&self) -> &TaskCore;

    fn core_mut(&mut self) -> &mut TaskCore;

    /// Forward action. Any error counts as a failed attempt.
    fn perform(&self, ctx: &TaskContext<'_>) -> anyhow::Result<()>;

    /// Undo action. Defaults to a no-op.
    fn reverse(&self, _ctx: &TaskContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Resolve any runtime arguments before the task is handed to the
    /// engine. Defaults to a no-op.
    fn fix_arguments(&self) -> anyhow::Result<()> {
        Ok(())
    }

    fn id(&self) -> TaskId {
        self.core().id()
    }

    fn name(&self) -> &str {
        self.core().name()
    }

    fn role(&self) -> Option<&str> {
        self.core().role()
    }

    fn repeat_policy(&self) -> RepeatPolicy {
        self.core().repeat()
    }

    fn performance_status(&self) -> PerformanceStatus {
        self.core().status()
    }

    fn set_performance_status(&self, status: PerformanceStatus) {
        self.core().set_status(status)
    }
}

impl fmt::Debug for dyn Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id())
            .field("name", &self.name())
            .field("status", &self.performance_status())
            .finish()
    }
}
