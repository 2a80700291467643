use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::bail;
use taskdag::dag::DependencyGraph;
use taskdag::events::{EventSink, SinkResult};
use taskdag::model::GraphableModel;
use taskdag::types::Direction;
use taskdag::TaskExecControl;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    OrchestrationStarting(Direction),
    OrchestrationFinished { direction: Direction, success: bool },
    EngineStarting { direction: Direction, tasks: usize },
    TaskStarting { task: String, attempt: u32 },
    TaskFinished { task: String },
    TaskFailed { task: String, error: String },
    TaskRetry { task: String, attempt: u32, error: String, fail_time_set: bool },
    EngineFinished,
}

/// Records every hook call, in arrival order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SinkEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, event: SinkEvent) -> SinkResult {
        self.events.lock().unwrap().push(event);
        Ok(())
    }

    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&SinkEvent) -> bool) -> usize {
        self.events().iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn orchestration_starting(&self, _model: &dyn GraphableModel, direction: Direction) -> SinkResult {
        self.push(SinkEvent::OrchestrationStarting(direction))
    }

    fn orchestration_finished(
        &self,
        _model: &dyn GraphableModel,
        direction: Direction,
        success: bool,
    ) -> SinkResult {
        self.push(SinkEvent::OrchestrationFinished { direction, success })
    }

    fn engine_starting(
        &self,
        _model: &dyn GraphableModel,
        graph: &DependencyGraph,
        direction: Direction,
    ) -> SinkResult {
        self.push(SinkEvent::EngineStarting {
            direction,
            tasks: graph.len(),
        })
    }

    fn task_starting(&self, _model: &dyn GraphableModel, tec: &TaskExecControl) -> SinkResult {
        self.push(SinkEvent::TaskStarting {
            task: tec.task().name().to_string(),
            attempt: tec.try_count(),
        })
    }

    fn task_finished(&self, _model: &dyn GraphableModel, tec: &TaskExecControl) -> SinkResult {
        self.push(SinkEvent::TaskFinished {
            task: tec.task().name().to_string(),
        })
    }

    fn task_failed(
        &self,
        _model: &dyn GraphableModel,
        tec: &TaskExecControl,
        errortext: &str,
    ) -> SinkResult {
        self.push(SinkEvent::TaskFailed {
            task: tec.task().name().to_string(),
            error: errortext.to_string(),
        })
    }

    fn task_retry(
        &self,
        _model: &dyn GraphableModel,
        tec: &TaskExecControl,
        errortext: &str,
    ) -> SinkResult {
        self.push(SinkEvent::TaskRetry {
            task: tec.task().name().to_string(),
            attempt: tec.try_count(),
            error: errortext.to_string(),
            fail_time_set: tec.fail_time().is_some(),
        })
    }

    fn engine_finished(&self, _model: &dyn GraphableModel) -> SinkResult {
        self.push(SinkEvent::EngineFinished)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    Error,
    Panic,
}

/// Misbehaves on every hook; counts how often it was called.
#[derive(Debug)]
pub struct FaultySink {
    fault: Fault,
    calls: AtomicUsize,
}

impl FaultySink {
    pub fn new(fault: Fault) -> Self {
        Self {
            fault,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn misbehave(&self, hook: &str) -> SinkResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.fault {
            Fault::Error => bail!("sink refused {hook}"),
            Fault::Panic => panic!("sink blew up in {hook}"),
        }
    }
}

impl EventSink for FaultySink {
    fn orchestration_starting(&self, _model: &dyn GraphableModel, _direction: Direction) -> SinkResult {
        self.misbehave("orchestration_starting")
    }

    fn orchestration_finished(
        &self,
        _model: &dyn GraphableModel,
        _direction: Direction,
        _success: bool,
    ) -> SinkResult {
        self.misbehave("orchestration_finished")
    }

    fn engine_starting(
        &self,
        _model: &dyn GraphableModel,
        _graph: &DependencyGraph,
        _direction: Direction,
    ) -> SinkResult {
        self.misbehave("engine_starting")
    }

    fn task_starting(&self, _model: &dyn GraphableModel, _tec: &TaskExecControl) -> SinkResult {
        self.misbehave("task_starting")
    }

    fn task_finished(&self, _model: &dyn GraphableModel, _tec: &TaskExecControl) -> SinkResult {
        self.misbehave("task_finished")
    }

    fn task_failed(
        &self,
        _model: &dyn GraphableModel,
        _tec: &TaskExecControl,
        _errortext: &str,
    ) -> SinkResult {
        self.misbehave("task_failed")
    }

    fn task_retry(
        &self,
        _model: &dyn GraphableModel,
        _tec: &TaskExecControl,
        _errortext: &str,
    ) -> SinkResult {
        self.misbehave("task_retry")
    }

    fn engine_finished(&self, _model: &dyn GraphableModel) -> SinkResult {
        self.misbehave("engine_finished")
    }
}
