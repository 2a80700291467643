// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

use crate::engine::AbortedTask;
use crate::types::Direction;

#[derive(Error, Debug)]
pub enum TaskdagError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Dangling dependency: edge {from} -> {to} references a task outside the graph")]
    DanglingDependency { from: String, to: String },

    #[error("Cycle detected in DAG: {0}")]
    DagCycle(String),

    #[error("Task not found: {0}")]
    UnknownTask(String),

    #[error("{direction} traversal failed: {} task(s) aborted", .failures.len())]
    TraversalFailed {
        direction: Direction,
        failures: Vec<AbortedTask>,
    },

    #[error("{direction} traversal cancelled by abort request")]
    Cancelled { direction: Direction },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TaskdagError {
    /// Terminal task failures carried by a failed traversal, if any.
    pub fn failures(&self) -> &[AbortedTask] {
        match self {
            TaskdagError::TraversalFailed { failures, .. } => failures,
            _ => &[],
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, TaskdagError>;

/// Render a caught panic payload as text.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
