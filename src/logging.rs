// src/logging.rs

//! Logging setup for `rawtoaces` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the log level:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `RAWTOACES_LOG` environment variable (e.g. "info", "debug")
//! 3. the `-v` count: none = warn, `-v` = info, `-vv` = debug, more = trace
//!
//! Logs are sent to STDERR; stdout carries the camera/illuminant listings.
//! `--use-timing` lines are logged at info under their own target, which
//! stays enabled at every level.

use anyhow::Result;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::LogLevel;
use crate::convert::timer::TIMING_TARGET;

pub const LOG_ENV_VAR: &str = "RAWTOACES_LOG";

/// Initialise global logging subscriber.
///
/// Safe to call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>, verbosity: u8) -> Result<()> {
    let env_level = std::env::var(LOG_ENV_VAR)
        .ok()
        .and_then(|s| parse_level_str(&s));
    let level = resolve_level(cli_level, env_level, verbosity);

    fmt()
        .with_env_filter(build_filter(level))
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

/// `level` for everything, plus the timing target at info.
pub fn build_filter(level: tracing::Level) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .parse_lossy(format!("{TIMING_TARGET}=info"))
}

pub fn resolve_level(
    cli_level: Option<LogLevel>,
    env_level: Option<tracing::Level>,
    verbosity: u8,
) -> tracing::Level {
    cli_level
        .map(level_from_log_level)
        .or(env_level)
        .unwrap_or_else(|| level_from_verbosity(verbosity))
}

fn level_from_verbosity(verbosity: u8) -> tracing::Level {
    match verbosity {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    }
}

fn level_from_log_level(lvl: LogLevel) -> tracing::Level {
    match lvl {
        LogLevel::Error => tracing::Level::ERROR,
        LogLevel::Warn => tracing::Level::WARN,
        LogLevel::Info => tracing::Level::INFO,
        LogLevel::Debug => tracing::Level::DEBUG,
        LogLevel::Trace => tracing::Level::TRACE,
    }
}

pub fn parse_level_str(s: &str) -> Option<tracing::Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(tracing::Level::ERROR),
        "warn" | "warning" => Some(tracing::Level::WARN),
        "info" => Some(tracing::Level::INFO),
        "debug" => Some(tracing::Level::DEBUG),
        "trace" => Some(tracing::Level::TRACE),
        _ => None,
    }
}
