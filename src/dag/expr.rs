// src/dag/expr.rs

//! Dependency expressions.
//!
//! An expression is built from task ids with two operators:
//!
//! - sequencing, `a.then(b)` or `a | b`: everything in `a` precedes `b`;
//! - grouping, `Dependency::group([x, y, z])`: members with no order among
//!   themselves, usable as a unit on either side of a sequence.
//!
//! [`Dependency::unpack`] flattens an expression into concrete
//! `(from, to)` pairs. Pairs live in a `BTreeSet`, so redundant edges from
//! overlapping expressions collapse to one.

use std::collections::{BTreeSet, HashMap};
use std::ops::BitOr;

use crate::task::Task;
use crate::types::TaskId;

/// `(from, to)`: `from` must succeed before `to` may start.
pub type DependencyPair = (TaskId, TaskId);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dependency {
    Task(TaskId),
    Sequence(Box<Dependency>, Box<Dependency>),
    Group(Vec<Dependency>),
}

impl Dependency {
    pub fn group<I, D>(members: I) -> Self
    where
        I: IntoIterator<Item = D>,
        D: Into<Dependency>,
    {
        Dependency::Group(members.into_iter().map(Into::into).collect())
    }

    pub fn then(self, next: impl Into<Dependency>) -> Self {
        Dependency::Sequence(Box::new(self), Box::new(next.into()))
    }

    /// Nodes with no predecessor inside this expression.
    pub fn entry_nodes(&self) -> BTreeSet<TaskId> {
        match self {
            Dependency::Task(id) => BTreeSet::from([*id]),
            Dependency::Sequence(first, _) => first.entry_nodes(),
            Dependency::Group(members) => members.iter().flat_map(|m| m.entry_nodes()).collect(),
        }
    }

    /// Nodes with no successor inside this expression.
    pub fn exit_nodes(&self) -> BTreeSet<TaskId> {
        match self {
            Dependency::Task(id) => BTreeSet::from([*id]),
            Dependency::Sequence(_, second) => second.exit_nodes(),
            Dependency::Group(members) => members.iter().flat_map(|m| m.exit_nodes()).collect(),
        }
    }

    /// Every task the expression mentions.
    pub fn nodes(&self) -> BTreeSet<TaskId> {
        let mut out = BTreeSet::new();
        self.collect_nodes(&mut out);
        out
    }

    fn collect_nodes(&self, out: &mut BTreeSet<TaskId>) {
        match self {
            Dependency::Task(id) => {
                out.insert(*id);
            }
            Dependency::Sequence(first, second) => {
                first.collect_nodes(out);
                second.collect_nodes(out);
            }
            Dependency::Group(members) => {
                for m in members {
                    m.collect_nodes(out);
                }
            }
        }
    }

    /// Flatten into concrete edges.
    pub fn unpack(&self) -> BTreeSet<DependencyPair> {
        let mut out = BTreeSet::new();
        self.unpack_into(&mut out);
        out
    }

    fn unpack_into(&self, out: &mut BTreeSet<DependencyPair>) {
        match self {
            Dependency::Task(_) => {}
            Dependency::Sequence(first, second) => {
                first.unpack_into(out);
                second.unpack_into(out);
                let entries = second.entry_nodes();
                for from in first.exit_nodes() {
                    for to in &entries {
                        out.insert((from, *to));
                    }
                }
            }
            Dependency::Group(members) => {
                for m in members {
                    m.unpack_into(out);
                }
            }
        }
    }

    /// Rewrite task ids through `map`; ids missing from the map are kept.
    pub fn remap(&self, map: &HashMap<TaskId, TaskId>) -> Self {
        match self {
            Dependency::Task(id) => Dependency::Task(*map.get(id).unwrap_or(id)),
            Dependency::Sequence(first, second) => {
                Dependency::Sequence(Box::new(first.remap(map)), Box::new(second.remap(map)))
            }
            Dependency::Group(members) => {
                Dependency::Group(members.iter().map(|m| m.remap(map)).collect())
            }
        }
    }
}

/// Union of the unpacked edges of several expressions.
pub fn unpack_all<'a, I>(exprs: I) -> BTreeSet<DependencyPair>
where
    I: IntoIterator<Item = &'a Dependency>,
{
    let mut out = BTreeSet::new();
    for expr in exprs {
        expr.unpack_into(&mut out);
    }
    out
}

impl From<TaskId> for Dependency {
    fn from(id: TaskId) -> Self {
        Dependency::Task(id)
    }
}

impl From<&dyn Task> for Dependency {
    fn from(task: &dyn Task) -> Self {
        Dependency::Task(task.id())
    }
}

impl From<&Dependency> for Dependency {
    fn from(dep: &Dependency) -> Self {
        dep.clone()
    }
}

impl<D: Into<Dependency>> BitOr<D> for Dependency {
    type Output = Dependency;

    fn bitor(self, rhs: D) -> Dependency {
        self.then(rhs)
    }
}

impl<D: Into<Dependency>> BitOr<D> for &Dependency {
    type Output = Dependency;

    fn bitor(self, rhs: D) -> Dependency {
        self.clone().then(rhs)
    }
}
