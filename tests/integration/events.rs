// tests/integration/events.rs

use std::sync::Arc;
use std::time::Duration;

use taskdag::engine::Engine;
use taskdag::types::Direction;
use taskdag::{ModelBuilder, RepeatPolicy};
use taskdag_test_utils::builders::fast_engine;
use taskdag_test_utils::scripted::{Recorder, Script, ScriptedTask};
use taskdag_test_utils::sinks::{Fault, FaultySink, RecordingSink, SinkEvent};

use crate::TestResult;

#[test]
fn sink_sees_the_full_lifecycle_in_order() -> TestResult {
    let rec = Recorder::new();
    let sink = Arc::new(RecordingSink::new());
    let mut builder = ModelBuilder::new("observed");
    let a = builder.add_task(ScriptedTask::new("A", &rec));
    let b = builder.add_task(ScriptedTask::new("B", &rec));
    builder.add_dependency(a | b);
    builder.with_event_sink(sink.clone());

    let engine = Engine::new(builder.instantiate()?, fast_engine(2));
    engine.orchestrate(Direction::Perform)?;

    let events = sink.events();
    assert_eq!(events.first(), Some(&SinkEvent::OrchestrationStarting(Direction::Perform)));
    assert_eq!(
        events.get(1),
        Some(&SinkEvent::EngineStarting {
            direction: Direction::Perform,
            tasks: 2
        })
    );
    assert_eq!(
        &events[2..],
        &[
            SinkEvent::TaskStarting { task: "A".into(), attempt: 1 },
            SinkEvent::TaskFinished { task: "A".into() },
            SinkEvent::TaskStarting { task: "B".into(), attempt: 1 },
            SinkEvent::TaskFinished { task: "B".into() },
            SinkEvent::EngineFinished,
            SinkEvent::OrchestrationFinished {
                direction: Direction::Perform,
                success: true
            },
        ]
    );
    Ok(())
}

#[test]
fn retry_and_failure_hooks_carry_error_text() -> TestResult {
    let rec = Recorder::new();
    let sink = Arc::new(RecordingSink::new());
    let mut builder = ModelBuilder::new("failing");
    builder.add_task(
        ScriptedTask::new("F", &rec)
            .perform_script(Script::AlwaysFail)
            .repeat(RepeatPolicy::until_success(2, Duration::from_millis(10))),
    );
    builder.with_event_sink(sink.clone());

    let engine = Engine::new(builder.instantiate()?, fast_engine(1));
    assert!(engine.orchestrate(Direction::Perform).is_err());

    let events = sink.events();
    assert!(events.contains(&SinkEvent::TaskRetry {
        task: "F".into(),
        attempt: 1,
        error: "scripted failure on attempt 1".into(),
        fail_time_set: true,
    }));
    assert!(events.contains(&SinkEvent::TaskFailed {
        task: "F".into(),
        error: "scripted failure on attempt 2".into(),
    }));
    assert_eq!(
        events.last(),
        Some(&SinkEvent::OrchestrationFinished {
            direction: Direction::Perform,
            success: false
        })
    );
    assert_eq!(sink.count(|e| matches!(e, SinkEvent::TaskFinished { .. })), 0);
    Ok(())
}

#[test]
fn plain_traversal_skips_orchestration_hooks() -> TestResult {
    let rec = Recorder::new();
    let sink = Arc::new(RecordingSink::new());
    let mut builder = ModelBuilder::new("plain");
    builder.add_task(ScriptedTask::new("solo", &rec));
    builder.with_event_sink(sink.clone());

    let engine = Engine::new(builder.instantiate()?, fast_engine(1));
    engine.perform_tasks()?;

    let orchestration = sink.count(|e| {
        matches!(
            e,
            SinkEvent::OrchestrationStarting(_) | SinkEvent::OrchestrationFinished { .. }
        )
    });
    assert_eq!(orchestration, 0);
    assert_eq!(sink.count(|e| *e == SinkEvent::EngineFinished), 1);
    Ok(())
}

#[test]
fn erroring_sink_does_not_affect_the_traversal() -> TestResult {
    let rec = Recorder::new();
    let sink = Arc::new(FaultySink::new(Fault::Error));
    let mut builder = ModelBuilder::new("grumpy-observer");
    let a = builder.add_task(ScriptedTask::new("A", &rec));
    let b = builder.add_task(ScriptedTask::new("B", &rec));
    builder.add_dependency(a | b);
    builder.with_event_sink(sink.clone());

    let engine = Engine::new(builder.instantiate()?, fast_engine(2));
    engine.orchestrate(Direction::Perform)?;

    assert_eq!(rec.finish_order(Direction::Perform), ["A", "B"]);
    // orchestration x2, engine x2, start/finish per task x2
    assert_eq!(sink.calls(), 8);
    Ok(())
}

#[test]
fn panicking_sink_does_not_affect_the_traversal() -> TestResult {
    let rec = Recorder::new();
    let sink = Arc::new(FaultySink::new(Fault::Panic));
    let mut builder = ModelBuilder::new("exploding-observer");
    let a = builder.add_task(ScriptedTask::new("A", &rec));
    let b = builder.add_task(ScriptedTask::new("B", &rec));
    builder.add_dependency(a | b);
    builder.with_event_sink(sink.clone());

    let engine = Engine::new(builder.instantiate()?, fast_engine(2));
    engine.perform_tasks()?;
    engine.perform_reverses()?;

    assert_eq!(rec.finish_order(Direction::Perform), ["A", "B"]);
    assert_eq!(rec.finish_order(Direction::Reverse), ["B", "A"]);
    assert!(sink.calls() > 0);
    Ok(())
}
