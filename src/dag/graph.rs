// src/dag/graph.rs

use std::collections::HashMap;
use std::sync::Arc;

use petgraph::Direction as EdgeDirection;
use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use tracing::debug;

use crate::dag::expr::DependencyPair;
use crate::errors::{Result, TaskdagError};
use crate::task::Task;
use crate::types::{Direction, TaskId};

/// Directed acyclic graph of tasks.
///
/// Edge direction: `from -> to` means `from` must succeed before `to` may
/// start. Every task handed to [`DependencyGraph::build`] is a node, even
/// when no edge touches it.
#[derive(Clone)]
pub struct DependencyGraph {
    graph: DiGraphMap<TaskId, ()>,
    tasks: HashMap<TaskId, Arc<dyn Task>>,
    /// Node order from the acyclicity check.
    order: Vec<TaskId>,
}

impl DependencyGraph {
    /// Build and validate a graph.
    ///
    /// Fails with [`TaskdagError::DanglingDependency`] if an edge mentions a
    /// task outside `tasks`, and with [`TaskdagError::DagCycle`] if the edges
    /// admit no topological order.
    pub fn build<I, E>(tasks: I, edges: E) -> Result<Self>
    where
        I: IntoIterator<Item = Arc<dyn Task>>,
        E: IntoIterator<Item = DependencyPair>,
    {
        let mut graph: DiGraphMap<TaskId, ()> = DiGraphMap::new();
        let mut by_id: HashMap<TaskId, Arc<dyn Task>> = HashMap::new();

        for task in tasks {
            graph.add_node(task.id());
            by_id.insert(task.id(), task);
        }

        let name_of = |id: &TaskId| {
            by_id
                .get(id)
                .map(|t| t.name().to_string())
                .unwrap_or_else(|| format!("<unknown {id}>"))
        };

        for (from, to) in edges {
            if !by_id.contains_key(&from) || !by_id.contains_key(&to) {
                return Err(TaskdagError::DanglingDependency {
                    from: name_of(&from),
                    to: name_of(&to),
                });
            }
            graph.add_edge(from, to, ());
        }

        // A topological sort will fail if there is a cycle.
        let order = match toposort(&graph, None) {
            Ok(order) => order,
            Err(cycle) => {
                return Err(TaskdagError::DagCycle(format!(
                    "cycle detected in task graph involving task '{}'",
                    name_of(&cycle.node_id())
                )));
            }
        };

        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "dependency graph built"
        );

        Ok(Self {
            graph,
            tasks: by_id,
            order,
        })
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn task(&self, id: TaskId) -> Option<&Arc<dyn Task>> {
        self.tasks.get(&id)
    }

    pub fn task_by_name(&self, name: &str) -> Option<&Arc<dyn Task>> {
        self.tasks.values().find(|t| t.name() == name)
    }

    /// All tasks, in a topological order.
    pub fn tasks(&self) -> impl Iterator<Item = &Arc<dyn Task>> {
        self.order.iter().filter_map(|id| self.tasks.get(id))
    }

    pub fn topological_order(&self) -> &[TaskId] {
        &self.order
    }

    pub fn contains_edge(&self, from: TaskId, to: TaskId) -> bool {
        self.graph.contains_edge(from, to)
    }

    pub fn edges(&self) -> impl Iterator<Item = DependencyPair> + '_ {
        self.graph.all_edges().map(|(from, to, _)| (from, to))
    }

    pub fn in_degree(&self, id: TaskId) -> usize {
        self.graph
            .neighbors_directed(id, EdgeDirection::Incoming)
            .count()
    }

    pub fn out_degree(&self, id: TaskId) -> usize {
        self.graph
            .neighbors_directed(id, EdgeDirection::Outgoing)
            .count()
    }

    /// Immediate prerequisites of `id` (tasks with an edge into it).
    pub fn dependencies_of(&self, id: TaskId) -> Vec<TaskId> {
        self.graph
            .neighbors_directed(id, EdgeDirection::Incoming)
            .collect()
    }

    /// Immediate dependents of `id` (tasks it has an edge to).
    pub fn dependents_of(&self, id: TaskId) -> Vec<TaskId> {
        self.graph
            .neighbors_directed(id, EdgeDirection::Outgoing)
            .collect()
    }

    /// How many nodes must finish before `id` becomes eligible when walking
    /// in `direction`: in-degree forwards, out-degree backwards.
    pub fn prerequisite_count(&self, id: TaskId, direction: Direction) -> usize {
        match direction {
            Direction::Perform => self.in_degree(id),
            Direction::Reverse => self.out_degree(id),
        }
    }

    /// Nodes whose counters advance when `id` finishes in `direction`.
    pub fn released_by(&self, id: TaskId, direction: Direction) -> Vec<TaskId> {
        match direction {
            Direction::Perform => self.dependents_of(id),
            Direction::Reverse => self.dependencies_of(id),
        }
    }
}

impl std::fmt::Debug for DependencyGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyGraph")
            .field("nodes", &self.graph.node_count())
            .field("edges", &self.graph.edge_count())
            .finish()
    }
}
