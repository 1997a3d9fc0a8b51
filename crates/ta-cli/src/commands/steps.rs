//! Steps command for showing the paired steps of a task.
//!
//! This module implements `ta steps --task <ID>`. Rows carry the export
//! columns: description, start time, end time and duration in seconds.

use std::io::Write;
use std::path::Path;

use anyhow::{Result, bail};
use serde::Serialize;
use ta_core::{StepRow, TaskReport};

use super::util::{load_reports, push_line};
use crate::Config;

/// Steps of one task for JSON output.
#[derive(Debug, Serialize)]
pub struct TaskSteps {
    pub task_id: i64,
    pub task_name: String,
    pub status: String,
    pub steps: Vec<StepRow>,
}

impl TaskSteps {
    pub fn new(report: &TaskReport, time_format: &str) -> Self {
        Self {
            task_id: report.id,
            task_name: report.name.clone(),
            status: report.status_label(),
            steps: report.step_rows(time_format),
        }
    }
}

fn format_row(marker: &str, start: &str, end: &str, duration: &str, description: &str) -> String {
    format!("{marker} {start:<19}  {end:<19}  {duration:>8}  {description}")
}

/// Formats the step tables of the given tasks.
///
/// Rows mentioning an error are marked with `!`.
pub fn format_steps(tasks: &[TaskSteps]) -> String {
    let mut output = String::new();

    for (i, task) in tasks.iter().enumerate() {
        if i > 0 {
            push_line(&mut output, "");
        }
        push_line(
            &mut output,
            &format!("Task {} {} ({})", task.task_id, task.task_name, task.status),
        );

        if task.steps.is_empty() {
            push_line(&mut output, "  (no steps)");
            continue;
        }

        push_line(
            &mut output,
            &format_row(" ", "START", "END", "DURATION", "DESCRIPTION"),
        );
        for row in &task.steps {
            let marker = if row.is_error { "!" } else { " " };
            push_line(
                &mut output,
                &format_row(marker, &row.start, &row.end, &row.duration, &row.description),
            );
        }
    }

    output
}

pub fn format_steps_json(tasks: &[TaskSteps]) -> Result<String> {
    Ok(serde_json::to_string_pretty(tasks)?)
}

/// Collects the steps of every task logged under `task_id`.
pub fn select_task(reports: &[TaskReport], task_id: i64, time_format: &str) -> Vec<TaskSteps> {
    reports
        .iter()
        .filter(|r| r.id == task_id)
        .map(|r| TaskSteps::new(r, time_format))
        .collect()
}

pub fn run<W: Write>(
    writer: &mut W,
    log: &Path,
    config: &Config,
    task_id: i64,
    json: bool,
) -> Result<()> {
    let reports = load_reports(log, config)?;
    let tasks = select_task(&reports, task_id, &config.time_format);

    if tasks.is_empty() {
        bail!("no task with ID {task_id} in {}", log.display());
    }

    if json {
        writeln!(writer, "{}", format_steps_json(&tasks)?)?;
    } else {
        write!(writer, "{}", format_steps(&tasks))?;
    }
    Ok(())
}
