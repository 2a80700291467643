// src/engine/mod.rs

//! The task-dependency execution engine.
//!
//! An [`Engine`] owns a model, builds (and caches) its dependency graph, and
//! drives forward (`perform`) and backward (`reverse`) traversals across a
//! bounded pool of worker threads.
//!
//! - [`pool`] contains the worker loop and queue handling.
//! - [`abort`] holds the stop flags.
//! - [`failure`] holds the record kept for each terminally failed task.

pub mod abort;
pub mod failure;
mod pool;

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::dag::DependencyGraph;
use crate::errors::{Result, TaskdagError};
use crate::events::EventDispatcher;
use crate::model::GraphableModel;
use crate::types::Direction;

pub use abort::AbortHandle;
pub use failure::AbortedTask;

use pool::PoolOutcome;

/// Schedules and runs the tasks of one model.
///
/// The graph is built on the first traversal and reused by later ones, so a
/// second `perform_tasks` after a partial failure only runs what is not yet
/// performed. Traversals on one engine never overlap: a call made while
/// another traversal is running waits for it to finish.
pub struct Engine<M> {
    model: M,
    config: EngineConfig,
    graph: Mutex<Option<Arc<DependencyGraph>>>,
    aborted: Mutex<Vec<AbortedTask>>,
    abort: AbortHandle,
    running: Mutex<()>,
}

impl<M: GraphableModel> Engine<M> {
    pub fn new(model: M, config: EngineConfig) -> Self {
        Self {
            model,
            config,
            graph: Mutex::new(None),
            aborted: Mutex::new(Vec::new()),
            abort: AbortHandle::new(),
            running: Mutex::new(()),
        }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Handle for stopping a traversal from another thread.
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// Run every task not yet performed, in dependency order.
    pub fn perform_tasks(&self) -> Result<()> {
        self.traverse(Direction::Perform)
    }

    /// Reverse every task not yet reversed, in reverse dependency order.
    pub fn perform_reverses(&self) -> Result<()> {
        self.traverse(Direction::Reverse)
    }

    /// Terminal failures of the most recent traversal.
    pub fn get_aborted_tasks(&self) -> Vec<AbortedTask> {
        self.aborted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The cached graph, building (with argument resolution) on first use.
    pub fn graph(&self) -> Result<Arc<DependencyGraph>> {
        let mut cached = self.graph.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(graph) = cached.as_ref() {
            return Ok(Arc::clone(graph));
        }
        let graph = Arc::new(self.model.get_graph(true)?);
        *cached = Some(Arc::clone(&graph));
        Ok(graph)
    }

    /// Drop the cached graph so the next traversal rebuilds it from the model.
    pub fn invalidate_graph(&self) {
        *self.graph.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// A traversal bracketed by the `orchestration_*` observer hooks.
    pub fn orchestrate(&self, direction: Direction) -> Result<()> {
        let events = EventDispatcher::new(&self.model);
        events.orchestration_starting(direction);
        let result = self.traverse(direction);
        events.orchestration_finished(direction, result.is_ok());
        result
    }

    fn traverse(&self, direction: Direction) -> Result<()> {
        let _running = self.running.lock().unwrap_or_else(PoisonError::into_inner);

        self.abort.reset();
        self.aborted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();

        let graph = self.graph()?;
        let events = EventDispatcher::new(&self.model);
        let started = Instant::now();

        info!(
            model = %self.model.name(),
            %direction,
            tasks = graph.len(),
            threads = self.config.num_threads,
            "traversal starting"
        );
        events.engine_starting(&graph, direction);

        let outcome = pool::run_traversal(&graph, direction, &self.config, &events, self.abort.clone());

        events.engine_finished();

        match outcome {
            PoolOutcome::Completed => {
                info!(
                    model = %self.model.name(),
                    %direction,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "traversal completed"
                );
                Ok(())
            }
            PoolOutcome::Failed(failures) => {
                warn!(
                    model = %self.model.name(),
                    %direction,
                    failed = failures.len(),
                    "traversal aborted after terminal failure"
                );
                *self.aborted.lock().unwrap_or_else(PoisonError::into_inner) = failures.clone();
                Err(TaskdagError::TraversalFailed { direction, failures })
            }
            PoolOutcome::Cancelled { remaining } => {
                debug!(%direction, remaining, "traversal cancelled");
                Err(TaskdagError::Cancelled { direction })
            }
        }
    }
}
