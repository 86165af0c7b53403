// src/convert/timer.rs

//! Per-step wall-clock timing, enabled with `--use-timing`.

use std::time::Instant;

use tracing::info;

/// Target the timing lines are logged under; enabled at info regardless of
/// the verbosity.
pub const TIMING_TARGET: &str = "rawtoaces::timing";

#[derive(Debug, Clone, Default)]
pub struct UsageTimer {
    pub enabled: bool,
    start: Option<Instant>,
}

impl UsageTimer {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            start: None,
        }
    }

    /// Start a new measurement. Does nothing while disabled.
    pub fn reset(&mut self) {
        if self.enabled {
            self.start = Some(Instant::now());
        }
    }

    /// `Timing: <path>/<message>: <ms>msec`, or `None` when disabled or
    /// never reset.
    pub fn report(&self, path: &str, message: &str) -> Option<String> {
        if !self.enabled {
            return None;
        }
        let start = self.start?;
        let msec = start.elapsed().as_secs_f64() * 1000.0;
        Some(format!("Timing: {path}/{message}: {msec:.3}msec"))
    }

    /// Log the report under [`TIMING_TARGET`].
    pub fn print(&self, path: &str, message: &str) {
        if let Some(line) = self.report(path, message) {
            info!(target: TIMING_TARGET, "{line}");
        }
    }
}
