// tests/integration/command_task.rs
#![cfg(unix)]

use std::collections::BTreeMap;
use std::fs;

use tempfile::tempdir;
use taskdag::config::{ModelFile, load_from_str};
use taskdag::engine::Engine;
use taskdag::task::{CommandError, CommandTask};
use taskdag::{ModelBuilder, PerformanceStatus, RepeatPolicy, TaskCore};
use taskdag_test_utils::builders::fast_engine;
use taskdag_test_utils::init_tracing;

use crate::TestResult;

#[test]
fn commands_run_in_order_and_see_task_environment() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let log = dir.path().join("log.txt");
    let log = log.to_string_lossy();

    let env = BTreeMap::from([("GREETING".to_string(), "hello".to_string())]);
    let mut builder = ModelBuilder::new("shell");
    let first = builder.add_task(
        CommandTask::new(TaskCore::new("first"), format!("echo \"$TASKDAG_TASK $GREETING\" >> {log}"))
            .with_env(env),
    );
    let second = builder.add_task(CommandTask::new(
        TaskCore::new("second").with_role("db"),
        format!("echo \"$TASKDAG_TASK $TASKDAG_ROLE $TASKDAG_ATTEMPT\" >> {log}"),
    ));
    builder.add_dependency(first | second);

    let engine = Engine::new(builder.instantiate()?, fast_engine(2));
    engine.perform_tasks()?;

    let written = fs::read_to_string(dir.path().join("log.txt"))?;
    let lines: Vec<&str> = written.lines().collect();
    assert_eq!(lines, ["first hello", "second db 1"]);
    Ok(())
}

#[test]
fn nonzero_exit_is_reported_with_context_chain() -> TestResult {
    let mut builder = ModelBuilder::new("shell-fail");
    builder.add_task(CommandTask::new(TaskCore::new("broken"), "exit 3"));

    let engine = Engine::new(builder.instantiate()?, fast_engine(1));
    assert!(engine.perform_tasks().is_err());

    let aborted = engine.get_aborted_tasks();
    assert_eq!(aborted.len(), 1);
    let failure = &aborted[0];
    assert_eq!(failure.error_value(), "performing task 'broken'");
    assert_eq!(failure.root_cause(), "command `exit 3` exited with code 3");
    assert_eq!(failure.narration().len(), 2);

    match failure.error().downcast_ref::<CommandError>() {
        Some(CommandError::NonZeroExit { code, .. }) => assert_eq!(*code, 3),
        other => panic!("expected NonZeroExit, got {other:?}"),
    }
    Ok(())
}

#[test]
fn retried_command_sees_increasing_attempt_numbers() -> TestResult {
    let dir = tempdir()?;
    let marker = dir.path().join("attempts");
    let marker = marker.to_string_lossy();

    // Succeeds only on the third attempt.
    let script = format!("echo $TASKDAG_ATTEMPT >> {marker}; test \"$TASKDAG_ATTEMPT\" -ge 3");
    let mut builder = ModelBuilder::new("shell-retry");
    builder.add_task(CommandTask::new(
        TaskCore::new("eventually")
            .with_repeat(RepeatPolicy::until_success(3, std::time::Duration::from_millis(10))),
        script,
    ));

    let engine = Engine::new(builder.instantiate()?, fast_engine(1));
    engine.perform_tasks()?;

    let seen = fs::read_to_string(dir.path().join("attempts"))?;
    assert_eq!(seen.lines().collect::<Vec<_>>(), ["1", "2", "3"]);
    Ok(())
}

#[test]
fn undo_runs_on_reverse_and_missing_undo_is_a_no_op() -> TestResult {
    let dir = tempdir()?;
    let state = dir.path().join("state");
    let state = state.to_string_lossy();

    let mut builder = ModelBuilder::new("shell-undo");
    let create = builder.add_task(
        CommandTask::new(TaskCore::new("create"), format!("touch {state}"))
            .with_undo(format!("rm {state}")),
    );
    let report = builder.add_task(CommandTask::new(TaskCore::new("report"), "true"));
    builder.add_dependency(create | report);

    let engine = Engine::new(builder.instantiate()?, fast_engine(2));
    engine.perform_tasks()?;
    assert!(dir.path().join("state").exists());

    engine.perform_reverses()?;
    assert!(!dir.path().join("state").exists());

    for task in engine.model().tasks() {
        assert_eq!(task.performance_status(), PerformanceStatus::Reversed);
    }
    Ok(())
}

#[test]
fn model_file_repeat_count_drives_command_attempts() -> TestResult {
    let dir = tempdir()?;
    let marker = dir.path().join("attempts");

    let raw = load_from_str(&format!(
        r#"
[task.x]
cmd = "echo $TASKDAG_ATTEMPT >> {}; exit 1"
repeat_count = 3
"#,
        marker.display()
    ))?;
    let model = ModelFile::try_from(raw)?.to_model_class()?.instantiate();

    let engine = Engine::new(model, fast_engine(1));
    assert!(engine.perform_tasks().is_err());

    let seen = fs::read_to_string(&marker)?;
    assert_eq!(seen.lines().collect::<Vec<_>>(), ["1", "2", "3"]);
    assert_eq!(engine.get_aborted_tasks()[0].attempts(), 3);
    Ok(())
}
