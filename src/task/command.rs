// src/task/command.rs

//! A task whose actions are shell commands.

use std::collections::BTreeMap;
use std::process::{Command, Output};

use anyhow::{Context, Result};
use thiserror::Error;
use tracing::{debug, info};

use crate::task::{Task, TaskContext, TaskCore};
use crate::types::Direction;

/// Failure of a command action.
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("command `{cmd}` exited with code {code}")]
    NonZeroExit { cmd: String, code: i32 },

    #[error("command `{cmd}` was terminated by a signal")]
    Terminated { cmd: String },
}

/// Runs `cmd` on perform and `undo` (if any) on reverse.
///
/// The child gets `TASKDAG_TASK`, `TASKDAG_ROLE` and `TASKDAG_ATTEMPT` in its
/// environment on top of any configured variables.
#[derive(Debug, Clone)]
pub struct CommandTask {
    core: TaskCore,
    cmd: String,
    undo: Option<String>,
    env: BTreeMap<String, String>,
}

impl CommandTask {
    pub fn new(core: TaskCore, cmd: impl Into<String>) -> Self {
        Self {
            core,
            cmd: cmd.into(),
            undo: None,
            env: BTreeMap::new(),
        }
    }

    pub fn with_undo(mut self, undo: impl Into<String>) -> Self {
        self.undo = Some(undo.into());
        self
    }

    pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = env;
        self
    }

    pub fn cmd(&self) -> &str {
        &self.cmd
    }

    pub fn undo(&self) -> Option<&str> {
        self.undo.as_deref()
    }

    fn run(&self, line: &str, ctx: &TaskContext<'_>) -> Result<()> {
        info!(
            task = %self.core.name(),
            direction = %ctx.direction(),
            attempt = ctx.attempt(),
            cmd = %line,
            "running command"
        );

        // Build a shell command appropriate for the platform.
        let mut cmd = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(line);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(line);
            c
        };

        cmd.envs(&self.env)
            .env("TASKDAG_TASK", self.core.name())
            .env("TASKDAG_ROLE", self.core.role().unwrap_or(""))
            .env("TASKDAG_ATTEMPT", ctx.attempt().to_string());

        let output = cmd
            .output()
            .with_context(|| format!("spawning process for task '{}'", self.core.name()))?;

        self.log_output(&output);

        if output.status.success() {
            return Ok(());
        }

        let err = match output.status.code() {
            Some(code) => CommandError::NonZeroExit {
                cmd: line.to_string(),
                code,
            },
            None => CommandError::Terminated {
                cmd: line.to_string(),
            },
        };
        Err(err.into())
    }

    fn log_output(&self, output: &Output) {
        for line in String::from_utf8_lossy(&output.stdout).lines() {
            info!(task = %self.core.name(), "stdout: {}", line);
        }
        for line in String::from_utf8_lossy(&output.stderr).lines() {
            debug!(task = %self.core.name(), "stderr: {}", line);
        }
    }
}

impl Task for CommandTask {
    fn core(&self) -> &TaskCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut TaskCore {
        &mut self.core
    }

    fn perform(&self, ctx: &TaskContext<'_>) -> Result<()> {
        self.run(&self.cmd, ctx)
            .with_context(|| format!("performing task '{}'", self.core.name()))
    }

    fn reverse(&self, ctx: &TaskContext<'_>) -> Result<()> {
        match &self.undo {
            Some(undo) => self
                .run(undo, ctx)
                .with_context(|| format!("reversing task '{}'", self.core.name())),
            None => {
                debug!(
                    task = %self.core.name(),
                    direction = %Direction::Reverse,
                    "no undo command; nothing to reverse"
                );
                Ok(())
            }
        }
    }
}
