// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{ModelFile, RawModelFile};
use crate::errors::Result;

/// Parse a model file without semantic validation.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawModelFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    let raw = load_from_str(&contents)?;
    debug!(path = %path.display(), tasks = raw.task.len(), "model file parsed");
    Ok(raw)
}

pub fn load_from_str(contents: &str) -> Result<RawModelFile> {
    Ok(toml::from_str(contents)?)
}

/// Parse and validate a model file: unknown or self `after` references,
/// `repeat_count`, engine settings and cycles.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ModelFile> {
    let raw = load_from_path(&path)?;
    ModelFile::try_from(raw)
}

/// `Taskdag.toml` in the current working directory.
pub fn default_model_path() -> PathBuf {
    PathBuf::from("Taskdag.toml")
}
