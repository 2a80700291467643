// src/engine/pool.rs

//! Fixed-size worker pool that drives one traversal.
//!
//! Workers share a crossbeam channel as the work queue and a single mutex
//! around the [`Traversal`] counters. Each queue entry is a
//! [`TaskExecControl`] owned by whoever currently holds it.

use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::dag::{DependencyGraph, Traversal};
use crate::engine::abort::{AbortHandle, StopSignal};
use crate::engine::failure::AbortedTask;
use crate::events::EventDispatcher;
use crate::exec::{AttemptOutcome, TaskExecControl, TaskRunner};
use crate::types::{Direction, TaskId};

/// How a traversal ended once every worker has exited.
#[derive(Debug)]
pub(crate) enum PoolOutcome {
    Completed,
    Failed(Vec<AbortedTask>),
    Cancelled { remaining: usize },
}

/// State every worker borrows for the duration of the traversal.
struct Shared<'a> {
    graph: &'a DependencyGraph,
    direction: Direction,
    config: &'a EngineConfig,
    events: &'a EventDispatcher<'a>,
    stop: &'a StopSignal,
    traversal: &'a Mutex<Traversal>,
    failures: &'a Mutex<Vec<AbortedTask>>,
    queue: &'a Sender<TaskExecControl>,
}

impl Shared<'_> {
    fn enqueue(&self, id: TaskId) {
        let Some(task) = self.graph.task(id) else {
            warn!(task = %id, "eligible node has no task; skipping");
            return;
        };
        debug!(task = %task.name(), "queueing task");
        self.requeue(TaskExecControl::new(Arc::clone(task)));
    }

    fn requeue(&self, tec: TaskExecControl) {
        if self.queue.send(tec).is_err() {
            warn!("work queue closed; dropping task");
        }
    }

    /// Count `tec` as done and queue whatever it unblocks.
    fn release(&self, tec: &TaskExecControl) {
        let step = self
            .traversal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .complete(self.graph, tec.task().id());

        if step.finished {
            info!(direction = %self.direction, "all tasks complete; stopping workers");
            self.stop.stop();
            return;
        }

        for id in step.newly_eligible {
            self.enqueue(id);
        }
    }

    fn record_failure(&self, aborted: AbortedTask) {
        warn!(
            task = %aborted.task_name(),
            direction = %self.direction,
            "terminal failure; aborting traversal"
        );
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(aborted);
        self.stop.stop();
    }
}

/// Run `direction` over `graph` with `config.num_threads` workers and wait for
/// all of them to exit.
pub(crate) fn run_traversal(
    graph: &DependencyGraph,
    direction: Direction,
    config: &EngineConfig,
    events: &EventDispatcher<'_>,
    abort: AbortHandle,
) -> PoolOutcome {
    if graph.is_empty() {
        return PoolOutcome::Completed;
    }

    let stop = StopSignal::new(abort);
    let traversal = Mutex::new(Traversal::new(graph, direction));
    let failures = Mutex::new(Vec::new());
    let (tx, rx) = crossbeam_channel::unbounded::<TaskExecControl>();

    let shared = Shared {
        graph,
        direction,
        config,
        events,
        stop: &stop,
        traversal: &traversal,
        failures: &failures,
        queue: &tx,
    };

    let seeds = traversal
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .seeds(graph);
    debug!(direction = %direction, seeds = seeds.len(), "seeding work queue");
    for id in seeds {
        shared.enqueue(id);
    }

    let workers = config.num_threads.max(1);
    thread::scope(|scope| {
        let mut spawned = 0;
        for worker in 0..workers {
            let rx = rx.clone();
            let shared = &shared;
            let res = thread::Builder::new()
                .name(format!("taskdag-worker-{worker}"))
                .spawn_scoped(scope, move || worker_loop(worker, shared, rx));
            match res {
                Ok(_) => spawned += 1,
                Err(err) => warn!(worker, error = %err, "failed to spawn worker thread"),
            }
        }

        if spawned == 0 {
            warn!("no worker threads could be spawned; running traversal inline");
            worker_loop(0, &shared, rx.clone());
        }
    });

    if stop.externally_aborted() {
        info!(direction = %direction, "traversal stopped by abort request");
    }

    let failures = failures.into_inner().unwrap_or_else(PoisonError::into_inner);
    let remaining = traversal
        .into_inner()
        .unwrap_or_else(PoisonError::into_inner)
        .remaining();

    if !failures.is_empty() {
        PoolOutcome::Failed(failures)
    } else if remaining > 0 {
        PoolOutcome::Cancelled { remaining }
    } else {
        PoolOutcome::Completed
    }
}

fn worker_loop(worker: usize, shared: &Shared<'_>, rx: Receiver<TaskExecControl>) {
    debug!(worker, "worker started");
    let runner = TaskRunner::new(shared.direction, shared.config, shared.stop, shared.events);
    let poll = shared.config.poll_interval();

    loop {
        if shared.stop.is_stopped() {
            break;
        }

        let mut tec = match rx.recv_timeout(poll) {
            Ok(tec) => tec,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };

        if shared.stop.is_stopped() {
            debug!(worker, task = %tec.task().name(), "stopped; not starting dequeued task");
            break;
        }

        match runner.run(&mut tec) {
            AttemptOutcome::Success | AttemptOutcome::Skipped => shared.release(&tec),
            AttemptOutcome::Retry => shared.requeue(tec),
            AttemptOutcome::Final(aborted) => shared.record_failure(aborted),
            AttemptOutcome::Aborted => {}
        }
    }

    debug!(worker, "worker exiting");
}
