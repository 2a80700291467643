// src/config/model.rs

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::task::RepeatPolicy;

/// Model file as read from TOML, before semantic validation.
///
/// ```toml
/// [engine]
/// num_threads = 4
/// no_delay = false
///
/// [task.network]
/// cmd = "./create-network.sh"
/// undo = "./delete-network.sh"
///
/// [task.app]
/// cmd = "./deploy.sh"
/// after = ["network"]
/// roles = ["web1", "web2"]
/// repeat_til_success = true
/// repeat_count = 3
/// repeat_interval = 5
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawModelFile {
    /// Optional `[model]` section.
    #[serde(default)]
    pub model: ModelSection,

    /// Engine tuning from `[engine]`.
    #[serde(default)]
    pub engine: EngineConfig,

    /// All tasks from `[task.<name>]`, keyed by task name.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,
}

/// A model file that passed [`crate::config::validate_config`].
#[derive(Debug, Clone)]
pub struct ModelFile {
    pub model: ModelSection,
    pub engine: EngineConfig,
    pub task: BTreeMap<String, TaskConfig>,
}

impl ModelFile {
    pub(crate) fn new_unchecked(
        model: ModelSection,
        engine: EngineConfig,
        task: BTreeMap<String, TaskConfig>,
    ) -> Self {
        Self {
            model,
            engine,
            task,
        }
    }
}

/// `[model]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelSection {
    #[serde(default = "default_model_name")]
    pub name: String,
}

fn default_model_name() -> String {
    "taskdag".to_string()
}

impl Default for ModelSection {
    fn default() -> Self {
        Self {
            name: default_model_name(),
        }
    }
}

/// Engine tuning, from the `[engine]` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Size of the worker pool.
    pub num_threads: usize,

    /// Skip the random delay before each task's first attempt.
    pub no_delay: bool,

    /// Upper bound of that random delay, in milliseconds.
    pub max_start_delay_ms: u64,

    /// Queue-pop timeout and backoff polling slice, in milliseconds.
    ///
    /// Workers notice a stop request within roughly one interval.
    pub poll_interval_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            num_threads: 4,
            no_delay: false,
            max_start_delay_ms: 1000,
            poll_interval_ms: 200,
        }
    }
}

impl EngineConfig {
    pub fn with_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = num_threads;
        self
    }

    pub fn without_delay(mut self) -> Self {
        self.no_delay = true;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_max_start_delay(mut self, max: Duration) -> Self {
        self.max_start_delay_ms = u64::try_from(max.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn max_start_delay(&self) -> Duration {
        Duration::from_millis(self.max_start_delay_ms)
    }
}

/// `[task.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    /// Command run on perform.
    pub cmd: String,

    /// Command run on reverse; reversing is a no-op without it.
    #[serde(default)]
    pub undo: Option<String>,

    /// Dependency list: this task waits for all tasks listed here.
    #[serde(default)]
    pub after: Vec<String>,

    /// If set, the task is a template expanded once per role.
    #[serde(default)]
    pub roles: Option<Vec<String>>,

    #[serde(default)]
    pub repeat_til_success: bool,

    #[serde(default = "default_repeat_count")]
    pub repeat_count: u32,

    /// Seconds.
    #[serde(default)]
    pub repeat_interval: u64,

    /// Extra environment for the commands.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

fn default_repeat_count() -> u32 {
    1
}

impl TaskConfig {
    pub fn repeat_policy(&self) -> RepeatPolicy {
        RepeatPolicy {
            repeat_til_success: self.repeat_til_success,
            repeat_count: self.repeat_count,
            repeat_interval: Duration::from_secs(self.repeat_interval),
        }
    }
}
