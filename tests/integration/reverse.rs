// tests/integration/reverse.rs

use std::time::Duration;

use taskdag::engine::Engine;
use taskdag::types::Direction;
use taskdag::{Dependency, ModelBuilder, PerformanceStatus, RepeatPolicy};
use taskdag_test_utils::builders::fast_engine;
use taskdag_test_utils::scripted::{Recorder, Script, ScriptedTask};

use crate::TestResult;

fn chain(rec: &Recorder) -> ModelBuilder {
    let mut builder = ModelBuilder::new("chain");
    let a = builder.add_task(ScriptedTask::new("A", rec));
    let b = builder.add_task(ScriptedTask::new("B", rec));
    let c = builder.add_task(ScriptedTask::new("C", rec));
    builder.add_dependency(a | b | c);
    builder
}

#[test]
fn reverse_walks_a_chain_backwards() -> TestResult {
    let rec = Recorder::new();
    let engine = Engine::new(chain(&rec).instantiate()?, fast_engine(3));

    engine.perform_tasks()?;
    assert_eq!(rec.finish_order(Direction::Perform), ["A", "B", "C"]);

    engine.perform_reverses()?;
    assert_eq!(rec.finish_order(Direction::Reverse), ["C", "B", "A"]);

    for task in engine.model().tasks() {
        assert_eq!(task.performance_status(), PerformanceStatus::Reversed);
    }
    Ok(())
}

#[test]
fn second_reverse_is_a_no_op() -> TestResult {
    let rec = Recorder::new();
    let engine = Engine::new(chain(&rec).instantiate()?, fast_engine(2));

    engine.perform_tasks()?;
    engine.perform_reverses()?;
    engine.perform_reverses()?;

    for name in ["A", "B", "C"] {
        assert_eq!(rec.start_count(name, Direction::Reverse), 1);
    }
    Ok(())
}

#[test]
fn perform_after_reverse_runs_everything_again() -> TestResult {
    let rec = Recorder::new();
    let engine = Engine::new(chain(&rec).instantiate()?, fast_engine(2));

    engine.perform_tasks()?;
    engine.perform_reverses()?;
    engine.perform_tasks()?;

    for name in ["A", "B", "C"] {
        assert_eq!(rec.start_count(name, Direction::Perform), 2);
    }
    assert_eq!(
        rec.finish_order(Direction::Perform),
        ["A", "B", "C", "A", "B", "C"]
    );
    Ok(())
}

#[test]
fn fan_in_reverses_sink_before_every_source() -> TestResult {
    let rec = Recorder::new();
    let mut builder = ModelBuilder::new("fan-in");
    let x = builder.add_task(ScriptedTask::new("x", &rec));
    let y = builder.add_task(ScriptedTask::new("y", &rec));
    let z = builder.add_task(ScriptedTask::new("z", &rec).reverse_script(Script::Sleep(Duration::from_millis(30))));
    builder.add_dependency(Dependency::group([x, y]) | z);

    let engine = Engine::new(builder.instantiate()?, fast_engine(3));
    engine.perform_tasks()?;
    engine.perform_reverses()?;

    let z_done = rec.last_finish("z", Direction::Reverse).ok_or("z never reversed")?;
    for name in ["x", "y"] {
        let start = rec.first_start(name, Direction::Reverse).ok_or("source never reversed")?;
        assert!(z_done <= start, "{name} reversed before z");
    }
    Ok(())
}

#[test]
fn reverse_retries_like_perform() -> TestResult {
    let rec = Recorder::new();
    let mut builder = ModelBuilder::new("reverse-retry");
    builder.add_task(
        ScriptedTask::new("sticky", &rec)
            .reverse_script(Script::FailTimes(1))
            .repeat(RepeatPolicy::until_success(2, Duration::from_millis(20))),
    );

    let engine = Engine::new(builder.instantiate()?, fast_engine(1));
    engine.perform_tasks()?;
    engine.perform_reverses()?;

    assert_eq!(rec.start_count("sticky", Direction::Reverse), 2);
    let sticky = engine.model().task_by_name("sticky").ok_or("sticky missing")?;
    assert_eq!(sticky.performance_status(), PerformanceStatus::Reversed);
    Ok(())
}

#[test]
fn failed_reverse_is_reported_with_its_direction() -> TestResult {
    let rec = Recorder::new();
    let mut builder = ModelBuilder::new("reverse-fail");
    let a = builder.add_task(ScriptedTask::new("A", &rec));
    let b = builder.add_task(ScriptedTask::new("B", &rec).reverse_script(Script::AlwaysFail));
    builder.add_dependency(a | b);

    let engine = Engine::new(builder.instantiate()?, fast_engine(2));
    engine.perform_tasks()?;
    assert!(engine.perform_reverses().is_err());

    let aborted = engine.get_aborted_tasks();
    assert_eq!(aborted.len(), 1);
    assert_eq!(aborted[0].task_name(), "B");
    assert_eq!(aborted[0].direction(), Direction::Reverse);
    // A depends on B being reversed first.
    assert_eq!(rec.start_count("A", Direction::Reverse), 0);

    let a_task = engine.model().task_by_name("A").ok_or("A missing")?;
    assert_eq!(a_task.performance_status(), PerformanceStatus::Performed);
    Ok(())
}
