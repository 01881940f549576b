// src/logging.rs

//! Subscriber setup for the `bootdag` binary.
//!
//! `--log-level` wins over `BOOTDAG_LOG`, which takes full `EnvFilter`
//! directives (`debug`, `bootdag::engine=trace,info`). Without either the
//! level is `info`. Output goes to stderr with thread names, so worker and
//! privileged-thread lines can be told apart; stdout carries only the run
//! summary.

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use crate::cli::LogLevel;

pub const LOG_ENV: &str = "BOOTDAG_LOG";

pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env = std::env::var(LOG_ENV).ok();

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(cli_level, env.as_deref()))
        .with_thread_names(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))
}

/// Filter for the given CLI level and `BOOTDAG_LOG` value.
///
/// Unparsable or empty directives fall back to `info`.
pub fn log_filter(cli_level: Option<LogLevel>, env: Option<&str>) -> EnvFilter {
    if let Some(level) = cli_level {
        return EnvFilter::new(level.as_directive());
    }
    env.map(str::trim)
        .filter(|d| !d.is_empty())
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

impl LogLevel {
    fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}
