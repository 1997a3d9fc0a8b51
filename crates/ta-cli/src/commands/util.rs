//! Shared utilities for CLI commands.

use std::path::Path;

use anyhow::{Context, Result};
use ta_core::{TaskLog, TaskReport, build_reports, parse_log_file};

use crate::Config;

/// Parses a log file with the configured channel marker.
pub fn load_log(path: &Path, config: &Config) -> Result<TaskLog> {
    let log = parse_log_file(path, &config.parse_config())
        .with_context(|| format!("failed to analyse {}", path.display()))?;

    let stats = log.stats();
    if stats.dropped_steps > 0 {
        tracing::info!(
            dropped = stats.dropped_steps,
            "step events outside any task were ignored"
        );
    }
    if stats.rejected_ends > 0 {
        tracing::warn!(
            rejected = stats.rejected_ends,
            "task ends stamped before their start were ignored"
        );
    }
    Ok(log)
}

/// Parses a log file and pairs every task's steps.
pub fn load_reports(path: &Path, config: &Config) -> Result<Vec<TaskReport>> {
    let log = load_log(path, config)?;
    Ok(build_reports(&log))
}

/// Writes `text` line by line without trailing whitespace.
pub fn push_line(output: &mut String, line: &str) {
    output.push_str(line.trim_end());
    output.push('\n');
}
