// src/config/mod.rs

//! Configuration loading and validation.
//!
//! Responsibilities:
//! - Define the TOML-backed model file and the `[engine]` settings (`model.rs`).
//! - Load a model file from disk (`loader.rs`).
//! - Validate basic invariants like DAG correctness (`validate.rs`).
//! - Assemble a [`crate::model::ModelClass`] of command tasks (`assemble.rs`).

pub mod assemble;
pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_model_path, load_and_validate, load_from_path, load_from_str};
pub use model::{EngineConfig, ModelFile, ModelSection, RawModelFile, TaskConfig};
pub use validate::validate_config;
