// tests/integration/model.rs

use std::collections::HashSet;
use std::sync::Arc;

use taskdag::engine::Engine;
use taskdag::errors::TaskdagError;
use taskdag::model::GraphableModel;
use taskdag::types::Direction;
use taskdag::{ModelBuilder, PerformanceStatus, Task};
use taskdag_test_utils::builders::fast_engine;
use taskdag_test_utils::scripted::{Recorder, ScriptedTask};

use crate::TestResult;

#[test]
fn instances_get_fresh_ids_and_independent_status() -> TestResult {
    let rec = Recorder::new();
    let mut builder = ModelBuilder::new("class");
    let a = builder.add_task(ScriptedTask::new("a", &rec));
    let b = builder.add_task(ScriptedTask::new("b", &rec));
    builder.add_dependency(a | b);
    let class = builder.build()?;

    let class_ids: HashSet<_> = class.tasks().iter().map(|t| t.id()).collect();
    let first = class.instantiate();
    let second = class.instantiate();
    let first_ids: HashSet<_> = first.tasks().iter().map(|t| t.id()).collect();
    let second_ids: HashSet<_> = second.tasks().iter().map(|t| t.id()).collect();

    assert!(class_ids.is_disjoint(&first_ids));
    assert!(first_ids.is_disjoint(&second_ids));

    // Edges are rewritten onto the copies.
    let graph = first.get_graph(false)?;
    let fa = graph.task_by_name("a").ok_or("a missing")?.id();
    let fb = graph.task_by_name("b").ok_or("b missing")?.id();
    assert!(graph.contains_edge(fa, fb));

    let first_engine = Engine::new(first, fast_engine(2));
    first_engine.perform_tasks()?;

    for task in second.tasks() {
        assert_eq!(task.performance_status(), PerformanceStatus::Unstarted);
    }
    for task in class.tasks() {
        assert_eq!(task.performance_status(), PerformanceStatus::Unstarted);
    }
    Ok(())
}

#[test]
fn template_expands_once_per_role() -> TestResult {
    let rec = Recorder::new();
    let mut builder = ModelBuilder::new("fleet");
    let network = builder.add_task(ScriptedTask::new("network", &rec));
    let template = ScriptedTask::new("deploy", &rec);
    let deploys = builder.add_template(&template, &["web1", "web2", "web3"]);
    let check = builder.add_task(ScriptedTask::new("check", &rec));
    builder.add_dependency(network | deploys | check);

    let engine = Engine::new(builder.instantiate()?, fast_engine(4));
    let model = engine.model();
    assert_eq!(model.tasks().len(), 5);

    let web2 = model.task_by_name("deploy@web2").ok_or("deploy@web2 missing")?;
    assert_eq!(web2.role(), Some("web2"));
    assert_ne!(web2.id(), template.id());

    engine.perform_tasks()?;

    let net_done = rec.last_finish("network", Direction::Perform).ok_or("network never ran")?;
    let check_start = rec.first_start("check", Direction::Perform).ok_or("check never ran")?;
    for role in ["web1", "web2", "web3"] {
        let name = format!("deploy@{role}");
        let start = rec.first_start(&name, Direction::Perform).ok_or("copy never ran")?;
        let done = rec.last_finish(&name, Direction::Perform).ok_or("copy never finished")?;
        assert!(net_done <= start);
        assert!(done <= check_start);
    }
    assert_eq!(rec.start_count("deploy", Direction::Perform), 0);
    Ok(())
}

#[test]
fn registering_the_same_task_twice_is_an_error() {
    let rec = Recorder::new();
    let task: Arc<dyn Task> = Arc::new(ScriptedTask::new("twin", &rec));
    let mut builder = ModelBuilder::new("dupes");
    builder.add_shared(Arc::clone(&task));
    builder.add_shared(task);

    match builder.build() {
        Err(TaskdagError::ConfigError(msg)) => assert!(msg.contains("twin")),
        Err(other) => panic!("expected ConfigError, got {other:?}"),
        Ok(_) => panic!("duplicate registration accepted"),
    }
}

#[test]
fn unresolvable_arguments_fail_before_any_action() -> TestResult {
    let rec = Recorder::new();
    let mut builder = ModelBuilder::new("unresolved");
    builder.add_task(ScriptedTask::new("fine", &rec));
    builder.add_task(ScriptedTask::new("broken", &rec).unresolvable());

    let model = builder.instantiate()?;
    // Plain graph construction does not resolve arguments.
    assert!(model.get_graph(false).is_ok());

    let engine = Engine::new(model, fast_engine(2));
    let err = engine.perform_tasks().expect_err("arguments cannot be resolved");
    let text = format!("{err:#}");
    assert!(text.contains("resolving arguments of task 'broken'"), "got: {text}");
    assert!(rec.records().is_empty());
    Ok(())
}

#[test]
fn instance_dependencies_apply_after_invalidating_the_graph() -> TestResult {
    let rec = Recorder::new();
    let mut builder = ModelBuilder::new("grown");
    builder.add_task(ScriptedTask::new("a", &rec));
    builder.add_task(ScriptedTask::new("b", &rec));

    let mut model = builder.instantiate()?;
    let a = model.handle("a")?;
    let z = model.add_task(ScriptedTask::new("z", &rec));
    model.add_dependency(z | a);

    let engine = Engine::new(model, fast_engine(2));
    let graph = engine.graph()?;
    assert_eq!(graph.len(), 3);
    assert_eq!(graph.edge_count(), 1);
    assert!(Arc::ptr_eq(&graph, &engine.graph()?));

    engine.invalidate_graph();
    assert!(!Arc::ptr_eq(&graph, &engine.graph()?));

    engine.perform_tasks()?;
    let z_done = rec.last_finish("z", Direction::Perform).ok_or("z never ran")?;
    let a_start = rec.first_start("a", Direction::Perform).ok_or("a never ran")?;
    assert!(z_done <= a_start);
    Ok(())
}

#[test]
fn unknown_handle_is_reported_by_name() -> TestResult {
    let model = ModelBuilder::new("empty").instantiate()?;
    assert!(matches!(
        model.handle("ghost"),
        Err(TaskdagError::UnknownTask(name)) if name == "ghost"
    ));
    Ok(())
}
