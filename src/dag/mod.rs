// src/dag/mod.rs

//! Task graph representation and traversal bookkeeping.
//!
//! - [`expr`] holds the dependency-expression algebra that authors use to
//!   describe ordering.
//! - [`graph`] holds the validated directed acyclic graph of tasks.
//! - [`traversal`] counts satisfied prerequisites while the engine walks the
//!   graph in either direction.

pub mod expr;
pub mod graph;
pub mod traversal;

pub use expr::{Dependency, DependencyPair, unpack_all};
pub use graph::DependencyGraph;
pub use traversal::{Traversal, TraversalStep};
