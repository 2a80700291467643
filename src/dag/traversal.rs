// src/dag/traversal.rs

//! Per-traversal bookkeeping over an immutable [`DependencyGraph`].
//!
//! A [`Traversal`] counts, for every node, how many of its prerequisites
//! (predecessors when performing, successors when reversing) have finished,
//! and how many nodes are still outstanding. It does no locking itself; the
//! engine keeps one behind a single mutex.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::dag::graph::DependencyGraph;
use crate::types::{Direction, TaskId};

/// Result of marking one node finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraversalStep {
    /// Nodes whose prerequisites are now all satisfied.
    pub newly_eligible: Vec<TaskId>,
    /// Whether this completion was the last outstanding node.
    pub finished: bool,
}

#[derive(Debug)]
pub struct Traversal {
    direction: Direction,
    /// `ins_traversed` when performing, `outs_traversed` when reversing.
    traversed: HashMap<TaskId, usize>,
    remaining: usize,
}

impl Traversal {
    pub fn new(graph: &DependencyGraph, direction: Direction) -> Self {
        let traversed = graph.topological_order().iter().map(|id| (*id, 0)).collect();
        Self {
            direction,
            traversed,
            remaining: graph.len(),
        }
    }

    /// Nodes that are eligible before anything has run.
    pub fn seeds(&self, graph: &DependencyGraph) -> Vec<TaskId> {
        let mut seeds: Vec<TaskId> = graph
            .topological_order()
            .iter()
            .copied()
            .filter(|id| graph.prerequisite_count(*id, self.direction) == 0)
            .collect();
        if self.direction == Direction::Reverse {
            // Start the teardown from the far end of the graph.
            seeds.reverse();
        }
        seeds
    }

    pub fn remaining(&self) -> usize {
        self.remaining
    }

    pub fn is_finished(&self) -> bool {
        self.remaining == 0
    }

    /// Record that `id` succeeded and release whatever it was holding back.
    ///
    /// When the last node completes no further nodes are released.
    pub fn complete(&mut self, graph: &DependencyGraph, id: TaskId) -> TraversalStep {
        if !self.traversed.contains_key(&id) {
            warn!(task = %id, "completion for node outside the traversal; ignoring");
            return TraversalStep {
                newly_eligible: Vec::new(),
                finished: self.is_finished(),
            };
        }

        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            debug!(direction = %self.direction, "traversal: last node completed");
            return TraversalStep {
                newly_eligible: Vec::new(),
                finished: true,
            };
        }

        let mut newly_eligible = Vec::new();
        for next in graph.released_by(id, self.direction) {
            let needed = graph.prerequisite_count(next, self.direction);
            let Some(count) = self.traversed.get_mut(&next) else {
                continue;
            };
            *count += 1;
            if *count == needed {
                newly_eligible.push(next);
            }
        }

        debug!(
            direction = %self.direction,
            task = %id,
            remaining = self.remaining,
            released = newly_eligible.len(),
            "traversal: node completed"
        );

        TraversalStep {
            newly_eligible,
            finished: false,
        }
    }
}
