// src/exec/runner.rs

//! Single-attempt execution of a task, with retry classification.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::anyhow;
use rand::Rng;
use tracing::{debug, error, info, warn};

use crate::config::EngineConfig;
use crate::engine::AbortedTask;
use crate::engine::abort::StopSignal;
use crate::errors::panic_message;
use crate::events::EventDispatcher;
use crate::exec::control::TaskExecControl;
use crate::task::TaskContext;
use crate::types::{Direction, ExecStatus};

/// How one pass through [`TaskRunner::run`] ended.
#[derive(Debug)]
pub enum AttemptOutcome {
    /// The action succeeded.
    Success,
    /// The task was already in the target state; nothing ran.
    Skipped,
    /// The action failed with attempts to spare; re-queue the same control.
    Retry,
    /// The action failed on its last permitted attempt.
    Final(AbortedTask),
    /// The traversal stopped before the action could start.
    Aborted,
}

/// Runs task actions for one traversal direction.
pub struct TaskRunner<'a> {
    direction: Direction,
    config: &'a EngineConfig,
    stop: &'a StopSignal,
    events: &'a EventDispatcher<'a>,
}

impl<'a> TaskRunner<'a> {
    pub(crate) fn new(
        direction: Direction,
        config: &'a EngineConfig,
        stop: &'a StopSignal,
        events: &'a EventDispatcher<'a>,
    ) -> Self {
        Self {
            direction,
            config,
            stop,
            events,
        }
    }

    /// Make one attempt at the task held by `tec`.
    ///
    /// Before a retry this blocks until the backoff deadline; before a first
    /// attempt it sleeps a random start delay unless `no_delay` is set. Both
    /// waits are sliced by the poll interval and give up as soon as the
    /// traversal is stopped.
    pub fn run(&self, tec: &mut TaskExecControl) -> AttemptOutcome {
        let task = Arc::clone(tec.task());
        let target = self.direction.target_status();

        if task.performance_status() == target {
            debug!(
                task = %task.name(),
                direction = %self.direction,
                status = ?target,
                "task already in target state; skipping"
            );
            tec.status = ExecStatus::Success;
            return AttemptOutcome::Skipped;
        }

        let ready = match tec.retry_deadline() {
            Some(deadline) => {
                debug!(
                    task = %task.name(),
                    attempts = tec.try_count,
                    "waiting for retry backoff"
                );
                self.wait_until(deadline)
            }
            None if tec.try_count == 0 => self.wait_until(Instant::now() + self.start_delay()),
            None => true,
        };

        if !ready || self.stop.is_stopped() {
            debug!(task = %task.name(), "traversal stopped before attempt; abandoning task");
            tec.status = ExecStatus::Abort;
            return AttemptOutcome::Aborted;
        }

        tec.try_count += 1;
        tec.status = ExecStatus::Performing;
        self.events.task_starting(tec);
        debug!(
            task = %task.name(),
            direction = %self.direction,
            attempt = tec.try_count,
            max_attempts = task.repeat_policy().max_attempts(),
            "starting attempt"
        );

        let ctx = TaskContext::new(self.direction, tec.try_count, self.stop);
        let result = catch_unwind(AssertUnwindSafe(|| match self.direction {
            Direction::Perform => task.perform(&ctx),
            Direction::Reverse => task.reverse(&ctx),
        }))
        .unwrap_or_else(|payload| Err(anyhow!("task panicked: {}", panic_message(&*payload))));

        match result {
            Ok(()) => {
                tec.status = ExecStatus::Success;
                task.set_performance_status(target);
                info!(
                    task = %task.name(),
                    direction = %self.direction,
                    attempts = tec.try_count,
                    "task succeeded"
                );
                self.events.task_finished(tec);
                AttemptOutcome::Success
            }
            Err(err) => {
                tec.fail_time = Some(Instant::now());
                let text = format!("{err:#}");

                if tec.has_attempts_left() {
                    tec.status = ExecStatus::FailRetry;
                    warn!(
                        task = %task.name(),
                        attempt = tec.try_count,
                        error = %text,
                        "attempt failed; will retry"
                    );
                    self.events.task_retry(tec, &text);
                    AttemptOutcome::Retry
                } else {
                    tec.status = ExecStatus::FailFinal;
                    error!(
                        task = %task.name(),
                        attempts = tec.try_count,
                        error = %text,
                        "task failed on final attempt"
                    );
                    let aborted = AbortedTask::new(Arc::clone(&task), self.direction, tec.try_count, err);
                    self.events.task_failed(tec, &text);
                    AttemptOutcome::Final(aborted)
                }
            }
        }
    }

    fn start_delay(&self) -> Duration {
        let max = self.config.max_start_delay();
        if self.config.no_delay || max.is_zero() {
            return Duration::ZERO;
        }
        rand::thread_rng().gen_range(Duration::ZERO..=max)
    }

    /// Sleep until `deadline` in poll-sized slices. Returns `false` if the
    /// traversal was stopped first.
    fn wait_until(&self, deadline: Instant) -> bool {
        let slice = self.config.poll_interval();
        loop {
            if self.stop.is_stopped() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            thread::sleep(slice.min(deadline - now));
        }
    }
}
