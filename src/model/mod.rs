// src/model/mod.rs

//! Models: the collections of tasks and dependency expressions the engine
//! consumes.
//!
//! The engine only sees the [`GraphableModel`] trait. This module also
//! provides a concrete, explicit-registration implementation:
//!
//! - [`ModelBuilder`] collects tasks and dependency expressions;
//! - [`ModelBuilder::build`] validates them once as a class ([`ModelClass`]);
//! - [`ModelClass::instantiate`] produces an independent [`Model`] whose
//!   tasks are fresh copies, and which may gain instance-level dependencies.
//!
//! - [`template`] expands one task template against many roles.

pub mod template;

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use anyhow::Context;
use tracing::debug;

use crate::dag::{Dependency, DependencyGraph, DependencyPair, unpack_all};
use crate::errors::{Result, TaskdagError};
use crate::events::EventSink;
use crate::task::Task;
use crate::types::TaskId;

pub use template::expand_for_roles;

/// What the engine needs from a model.
pub trait GraphableModel: Send + Sync {
    fn name(&self) -> &str {
        "model"
    }

    /// All task nodes of this model.
    fn get_tasks(&self) -> Vec<Arc<dyn Task>>;

    /// Unpacked `(from, to)` pairs, plus the tasks that take part in no edge.
    fn get_dependencies(&self) -> (Vec<DependencyPair>, BTreeSet<TaskId>);

    /// Build the validated task graph, optionally letting every task resolve
    /// its runtime arguments first.
    fn get_graph(&self, with_fix: bool) -> Result<DependencyGraph> {
        let tasks = self.get_tasks();
        if with_fix {
            for task in &tasks {
                task.fix_arguments()
                    .with_context(|| format!("resolving arguments of task '{}'", task.name()))?;
            }
        }
        let (edges, _independent) = self.get_dependencies();
        DependencyGraph::build(tasks, edges)
    }

    fn get_event_handler(&self) -> Option<Arc<dyn EventSink>> {
        None
    }
}

/// Shared by class and instance: unpack `dependencies` and split off the
/// tasks no edge touches.
fn split_dependencies(
    tasks: &[Arc<dyn Task>],
    dependencies: &[Dependency],
) -> (Vec<DependencyPair>, BTreeSet<TaskId>) {
    let edges = unpack_all(dependencies);
    let touched: HashSet<TaskId> = edges.iter().flat_map(|(a, b)| [*a, *b]).collect();
    let independent = tasks
        .iter()
        .map(|t| t.id())
        .filter(|id| !touched.contains(id))
        .collect();
    (edges.into_iter().collect(), independent)
}

/// Explicit registration API for tasks and dependency expressions.
#[derive(Default)]
pub struct ModelBuilder {
    name: String,
    tasks: Vec<Arc<dyn Task>>,
    dependencies: Vec<Dependency>,
    sink: Option<Arc<dyn EventSink>>,
}

impl ModelBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Register a task and return an expression naming it.
    pub fn add_task(&mut self, task: impl Task + 'static) -> Dependency {
        self.add_shared(Arc::new(task))
    }

    pub fn add_boxed(&mut self, task: Box<dyn Task>) -> Dependency {
        self.add_shared(Arc::from(task))
    }

    pub fn add_shared(&mut self, task: Arc<dyn Task>) -> Dependency {
        let handle = Dependency::Task(task.id());
        self.tasks.push(task);
        handle
    }

    /// Register one copy of `template` per role and return the group of all
    /// copies.
    pub fn add_template<S: AsRef<str>>(&mut self, template: &dyn Task, roles: &[S]) -> Dependency {
        let members: Vec<Dependency> = expand_for_roles(template, roles)
            .into_iter()
            .map(|t| self.add_boxed(t))
            .collect();
        Dependency::Group(members)
    }

    /// Declare an ordering. Repeated calls accumulate.
    pub fn add_dependency(&mut self, dependency: impl Into<Dependency>) -> &mut Self {
        self.dependencies.push(dependency.into());
        self
    }

    pub fn with_event_sink(&mut self, sink: Arc<dyn EventSink>) -> &mut Self {
        self.sink = Some(sink);
        self
    }

    /// Validate the declarations (unique tasks, no dangling references, no
    /// cycles) and freeze them into a class.
    pub fn build(self) -> Result<ModelClass> {
        let mut seen = HashSet::new();
        for task in &self.tasks {
            if !seen.insert(task.id()) {
                return Err(TaskdagError::ConfigError(format!(
                    "task '{}' registered twice in model '{}'",
                    task.name(),
                    self.name
                )));
            }
        }

        let class = ModelClass {
            name: self.name,
            tasks: self.tasks,
            dependencies: self.dependencies,
            sink: self.sink,
        };
        let (edges, _) = split_dependencies(&class.tasks, &class.dependencies);
        DependencyGraph::build(class.tasks.iter().cloned(), edges)?;
        debug!(model = %class.name, tasks = class.tasks.len(), "model class validated");
        Ok(class)
    }

    /// Shortcut for `build()?.instantiate()`.
    pub fn instantiate(self) -> Result<Model> {
        Ok(self.build()?.instantiate())
    }
}

/// A validated, immutable set of task templates and dependencies.
pub struct ModelClass {
    name: String,
    tasks: Vec<Arc<dyn Task>>,
    dependencies: Vec<Dependency>,
    sink: Option<Arc<dyn EventSink>>,
}

impl ModelClass {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tasks(&self) -> &[Arc<dyn Task>] {
        &self.tasks
    }

    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    /// Create a live model: every task is deep-cloned with a fresh identity
    /// and the dependency expressions are rewritten to point at the copies.
    pub fn instantiate(&self) -> Model {
        let mut id_map = HashMap::with_capacity(self.tasks.len());
        let tasks: Vec<Arc<dyn Task>> = self
            .tasks
            .iter()
            .map(|t| {
                let copy: Arc<dyn Task> = Arc::from(t.clone_boxed());
                id_map.insert(t.id(), copy.id());
                copy
            })
            .collect();
        let dependencies = self.dependencies.iter().map(|d| d.remap(&id_map)).collect();

        Model {
            name: self.name.clone(),
            tasks,
            dependencies,
            sink: self.sink.clone(),
        }
    }
}

/// A live model instance that the engine can traverse.
pub struct Model {
    name: String,
    tasks: Vec<Arc<dyn Task>>,
    dependencies: Vec<Dependency>,
    sink: Option<Arc<dyn EventSink>>,
}

impl Model {
    pub fn add_task(&mut self, task: impl Task + 'static) -> Dependency {
        let task: Arc<dyn Task> = Arc::new(task);
        let handle = Dependency::Task(task.id());
        self.tasks.push(task);
        handle
    }

    /// Instance-level ordering, validated when the graph is next built.
    pub fn add_dependency(&mut self, dependency: impl Into<Dependency>) -> &mut Self {
        self.dependencies.push(dependency.into());
        self
    }

    pub fn set_event_sink(&mut self, sink: Arc<dyn EventSink>) {
        self.sink = Some(sink);
    }

    pub fn tasks(&self) -> &[Arc<dyn Task>] {
        &self.tasks
    }

    pub fn task_by_name(&self, name: &str) -> Option<&Arc<dyn Task>> {
        self.tasks.iter().find(|t| t.name() == name)
    }

    /// Expression naming the task called `name`.
    pub fn handle(&self, name: &str) -> Result<Dependency> {
        self.task_by_name(name)
            .map(|t| Dependency::Task(t.id()))
            .ok_or_else(|| TaskdagError::UnknownTask(name.to_string()))
    }
}

impl GraphableModel for Model {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_tasks(&self) -> Vec<Arc<dyn Task>> {
        self.tasks.clone()
    }

    fn get_dependencies(&self) -> (Vec<DependencyPair>, BTreeSet<TaskId>) {
        split_dependencies(&self.tasks, &self.dependencies)
    }

    fn get_event_handler(&self) -> Option<Arc<dyn EventSink>> {
        self.sink.clone()
    }
}
