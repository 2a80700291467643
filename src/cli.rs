// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, Subcommand, ValueEnum};

/// Command-line arguments for `taskdag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "taskdag",
    version,
    about = "Run a dependency graph of tasks forwards or tear it down in reverse.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the model file (TOML).
    ///
    /// Default: `Taskdag.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Taskdag.toml")]
    pub model: String,

    /// Override `[engine].num_threads`.
    #[arg(long, value_name = "N")]
    pub threads: Option<usize>,

    /// Skip the random delay before each task's first attempt.
    #[arg(long)]
    pub no_delay: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `TASKDAG_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, Subcommand)]
pub enum Command {
    /// Perform every task in dependency order.
    Perform,
    /// Reverse every task in reverse dependency order.
    Reverse,
    /// Validate the model and print the execution plan without running it.
    Plan,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
