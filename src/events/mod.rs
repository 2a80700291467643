// src/events/mod.rs

//! Lifecycle notifications for observers of the engine.
//!
//! An [`EventSink`] is an optional, best-effort observer: every hook has a
//! no-op default, and the engine calls hooks through an [`EventDispatcher`]
//! which logs and swallows both returned errors and panics, so an observer can
//! never change the outcome of a traversal.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::dag::DependencyGraph;
use crate::errors::panic_message;
use crate::exec::TaskExecControl;
use crate::model::GraphableModel;
use crate::types::Direction;

pub type SinkResult = anyhow::Result<()>;

/// Observer of engine lifecycle events. Hooks must return promptly.
pub trait EventSink: Send + Sync {
    fn orchestration_starting(&self, _model: &dyn GraphableModel, _direction: Direction) -> SinkResult {
        Ok(())
    }

    fn orchestration_finished(
        &self,
        _model: &dyn GraphableModel,
        _direction: Direction,
        _success: bool,
    ) -> SinkResult {
        Ok(())
    }

    fn engine_starting(
        &self,
        _model: &dyn GraphableModel,
        _graph: &DependencyGraph,
        _direction: Direction,
    ) -> SinkResult {
        Ok(())
    }

    fn task_starting(&self, _model: &dyn GraphableModel, _tec: &TaskExecControl) -> SinkResult {
        Ok(())
    }

    fn task_finished(&self, _model: &dyn GraphableModel, _tec: &TaskExecControl) -> SinkResult {
        Ok(())
    }

    fn task_failed(
        &self,
        _model: &dyn GraphableModel,
        _tec: &TaskExecControl,
        _errortext: &str,
    ) -> SinkResult {
        Ok(())
    }

    fn task_retry(
        &self,
        _model: &dyn GraphableModel,
        _tec: &TaskExecControl,
        _errortext: &str,
    ) -> SinkResult {
        Ok(())
    }

    fn engine_finished(&self, _model: &dyn GraphableModel) -> SinkResult {
        Ok(())
    }
}

/// Calls into an optional sink, isolating the engine from its failures.
pub struct EventDispatcher<'a> {
    model: &'a dyn GraphableModel,
    sink: Option<Arc<dyn EventSink>>,
}

impl<'a> EventDispatcher<'a> {
    pub fn new(model: &'a dyn GraphableModel) -> Self {
        Self {
            model,
            sink: model.get_event_handler(),
        }
    }

    fn notify<F>(&self, hook: &'static str, f: F)
    where
        F: FnOnce(&dyn EventSink, &dyn GraphableModel) -> SinkResult,
    {
        let Some(sink) = self.sink.as_deref() else {
            return;
        };

        match catch_unwind(AssertUnwindSafe(|| f(sink, self.model))) {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                warn!(hook, error = %format!("{err:#}"), "event sink returned an error; ignoring");
            }
            Err(payload) => {
                warn!(
                    hook,
                    panic = %panic_message(&*payload),
                    "event sink panicked; ignoring"
                );
            }
        }
    }

    pub fn orchestration_starting(&self, direction: Direction) {
        self.notify("orchestration_starting", |s, m| s.orchestration_starting(m, direction));
    }

    pub fn orchestration_finished(&self, direction: Direction, success: bool) {
        self.notify("orchestration_finished", |s, m| {
            s.orchestration_finished(m, direction, success)
        });
    }

    pub fn engine_starting(&self, graph: &DependencyGraph, direction: Direction) {
        self.notify("engine_starting", |s, m| s.engine_starting(m, graph, direction));
    }

    pub fn task_starting(&self, tec: &TaskExecControl) {
        self.notify("task_starting", |s, m| s.task_starting(m, tec));
    }

    pub fn task_finished(&self, tec: &TaskExecControl) {
        self.notify("task_finished", |s, m| s.task_finished(m, tec));
    }

    pub fn task_failed(&self, tec: &TaskExecControl, errortext: &str) {
        self.notify("task_failed", |s, m| s.task_failed(m, tec, errortext));
    }

    pub fn task_retry(&self, tec: &TaskExecControl, errortext: &str) {
        self.notify("task_retry", |s, m| s.task_retry(m, tec, errortext));
    }

    pub fn engine_finished(&self) {
        self.notify("engine_finished", |s, m| s.engine_finished(m));
    }
}

/// Sink that turns lifecycle events into log lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn orchestration_starting(&self, model: &dyn GraphableModel, direction: Direction) -> SinkResult {
        info!(model = %model.name(), %direction, "orchestration starting");
        Ok(())
    }

    fn orchestration_finished(
        &self,
        model: &dyn GraphableModel,
        direction: Direction,
        success: bool,
    ) -> SinkResult {
        info!(model = %model.name(), %direction, success, "orchestration finished");
        Ok(())
    }

    fn engine_starting(
        &self,
        model: &dyn GraphableModel,
        graph: &DependencyGraph,
        direction: Direction,
    ) -> SinkResult {
        info!(
            model = %model.name(),
            %direction,
            tasks = graph.len(),
            edges = graph.edge_count(),
            "engine starting"
        );
        Ok(())
    }

    fn task_starting(&self, _model: &dyn GraphableModel, tec: &TaskExecControl) -> SinkResult {
        debug!(task = %tec.task().name(), attempt = tec.try_count(), "task starting");
        Ok(())
    }

    fn task_finished(&self, _model: &dyn GraphableModel, tec: &TaskExecControl) -> SinkResult {
        info!(task = %tec.task().name(), attempts = tec.try_count(), "task finished");
        Ok(())
    }

    fn task_failed(
        &self,
        _model: &dyn GraphableModel,
        tec: &TaskExecControl,
        errortext: &str,
    ) -> SinkResult {
        error!(task = %tec.task().name(), attempts = tec.try_count(), error = %errortext, "task failed");
        Ok(())
    }

    fn task_retry(
        &self,
        _model: &dyn GraphableModel,
        tec: &TaskExecControl,
        errortext: &str,
    ) -> SinkResult {
        warn!(task = %tec.task().name(), attempt = tec.try_count(), error = %errortext, "task will be retried");
        Ok(())
    }

    fn engine_finished(&self, model: &dyn GraphableModel) -> SinkResult {
        info!(model = %model.name(), "engine finished");
        Ok(())
    }
}
