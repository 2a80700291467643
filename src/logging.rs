// src/logging.rs

//! Logging setup for `taskdag` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the filter:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `TASKDAG_LOG` environment variable, any `EnvFilter` directive
//!    (e.g. "debug", "taskdag::engine=trace,info")
//! 3. default to `info`
//!
//! Logs go to STDERR with worker thread names, so interleaved task output
//! can be told apart. The `plan` listing and the failure report go to STDOUT.

use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::LogLevel;

pub const LOG_ENV: &str = "TASKDAG_LOG";

/// Initialise global logging subscriber.
///
/// Safe to call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let filter = match cli_level {
        Some(lvl) => EnvFilter::new(level_directive(lvl)),
        None => match std::env::var(LOG_ENV) {
            Ok(directives) if !directives.trim().is_empty() => EnvFilter::try_new(directives.trim())
                .with_context(|| format!("invalid {LOG_ENV} filter '{directives}'"))?,
            _ => EnvFilter::new("info"),
        },
    };

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("initialising logging: {e}"))?;

    Ok(())
}

fn level_directive(lvl: LogLevel) -> &'static str {
    match lvl {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}
