// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod events;
pub mod exec;
pub mod logging;
pub mod model;
pub mod task;
pub mod types;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};

use crate::cli::{CliArgs, Command};
use crate::config::{EngineConfig, ModelFile, load_and_validate};
use crate::dag::DependencyGraph;
use crate::engine::Engine;
use crate::errors::TaskdagError;
use crate::events::TracingSink;
use crate::model::GraphableModel;
use crate::types::Direction;

pub use crate::dag::{Dependency, DependencyPair};
pub use crate::engine::{AbortHandle, AbortedTask};
pub use crate::errors::Result as TaskdagResult;
pub use crate::events::EventSink;
pub use crate::exec::TaskExecControl;
pub use crate::model::{Model, ModelBuilder, ModelClass};
pub use crate::task::{RepeatPolicy, Task, TaskContext, TaskCore};
pub use crate::types::{ExecStatus, PerformanceStatus, TaskId};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - model file loading and validation
/// - model class assembly and instantiation
/// - the engine and one traversal (or a dry-run plan)
pub fn run(args: CliArgs) -> Result<()> {
    let model_path = PathBuf::from(&args.model);
    let file = load_and_validate(&model_path)?;
    let config = engine_config(&file, &args);

    let mut model = file.to_model_class()?.instantiate();
    model.set_event_sink(Arc::new(TracingSink));

    let direction = match args.command {
        Command::Plan => {
            let graph = model.get_graph(false)?;
            print_plan(&file, &config, &graph);
            return Ok(());
        }
        Command::Perform => Direction::Perform,
        Command::Reverse => Direction::Reverse,
    };

    info!(model = %file.model.name, path = %model_path.display(), %direction, "running model");
    let engine = Engine::new(model, config);

    match engine.orchestrate(direction) {
        Ok(()) => Ok(()),
        Err(err @ TaskdagError::TraversalFailed { .. }) => {
            print_failures(&engine.get_aborted_tasks());
            Err(err.into())
        }
        Err(err) => Err(err.into()),
    }
}

/// File settings with CLI overrides applied.
fn engine_config(file: &ModelFile, args: &CliArgs) -> EngineConfig {
    let mut config = file.engine;
    if let Some(threads) = args.threads {
        config = config.with_threads(threads.max(1));
    }
    if args.no_delay {
        config = config.without_delay();
    }
    debug!(?config, "effective engine config");
    config
}

/// Dry-run output: tasks, their dependencies and one valid execution order.
fn print_plan(file: &ModelFile, config: &EngineConfig, graph: &DependencyGraph) {
    println!("taskdag plan: {}", file.model.name);
    println!("  engine.num_threads = {}", config.num_threads);
    println!("  engine.no_delay = {}", config.no_delay);
    println!();

    println!("tasks ({}):", graph.len());
    for (step, task) in graph.tasks().enumerate() {
        println!("  {:>3}. {}", step + 1, task.name());
        let deps: Vec<&str> = graph
            .dependencies_of(task.id())
            .into_iter()
            .filter_map(|id| graph.task(id).map(|t| t.name()))
            .collect();
        if !deps.is_empty() {
            println!("       after: {:?}", deps);
        }
        let policy = task.repeat_policy();
        if policy.max_attempts() > 1 {
            println!(
                "       attempts: {} (interval {}s)",
                policy.max_attempts(),
                policy.repeat_interval.as_secs()
            );
        }
    }

    debug!("plan complete (no execution)");
}

fn print_failures(failures: &[AbortedTask]) {
    println!("aborted tasks ({}):", failures.len());
    for failure in failures {
        println!("  - {} ({} attempt(s))", failure.task_name(), failure.attempts());
        for line in failure.narration() {
            println!("      {line}");
        }
    }
}
