#![allow(dead_code)]

use std::collections::BTreeMap;
use std::time::Duration;

use taskdag::config::{EngineConfig, ModelFile, ModelSection, RawModelFile, TaskConfig};

/// Engine settings for tests: no start jitter and a short poll slice.
pub fn fast_engine(num_threads: usize) -> EngineConfig {
    EngineConfig::default()
        .with_threads(num_threads)
        .without_delay()
        .with_poll_interval(Duration::from_millis(10))
}

/// Builder for `ModelFile` to simplify test setup.
pub struct ModelFileBuilder {
    file: RawModelFile,
}

impl ModelFileBuilder {
    pub fn new() -> Self {
        Self {
            file: RawModelFile {
                model: ModelSection::default(),
                engine: fast_engine(4),
                task: BTreeMap::new(),
            },
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.file.model.name = name.to_string();
        self
    }

    pub fn with_task(mut self, name: &str, task: TaskConfig) -> Self {
        self.file.task.insert(name.to_string(), task);
        self
    }

    pub fn with_engine(mut self, engine: EngineConfig) -> Self {
        self.file.engine = engine;
        self
    }

    pub fn raw(self) -> RawModelFile {
        self.file
    }

    pub fn build(self) -> ModelFile {
        ModelFile::try_from(self.file).expect("Failed to build valid model file from builder")
    }
}

impl Default for ModelFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    pub fn new(cmd: &str) -> Self {
        Self {
            task: TaskConfig {
                cmd: cmd.to_string(),
                undo: None,
                after: vec![],
                roles: None,
                repeat_til_success: false,
                repeat_count: 1,
                repeat_interval: 0,
                env: BTreeMap::new(),
            },
        }
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.task.after.push(dep.to_string());
        self
    }

    pub fn undo(mut self, cmd: &str) -> Self {
        self.task.undo = Some(cmd.to_string());
        self
    }

    pub fn roles(mut self, roles: &[&str]) -> Self {
        self.task.roles = Some(roles.iter().map(|r| r.to_string()).collect());
        self
    }

    pub fn repeat(mut self, count: u32, interval_secs: u64) -> Self {
        self.task.repeat_til_success = true;
        self.task.repeat_count = count;
        self.task.repeat_interval = interval_secs;
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.task.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}
