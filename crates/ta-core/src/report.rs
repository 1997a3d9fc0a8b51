//! Task/step report model consumed by presentation layers.

use chrono::NaiveDateTime;
use rayon::prelude::*;
use serde::Serialize;

use crate::pairing::{PairingSummary, StepInterval, pair_steps};
use crate::reconstruct::TaskLog;
use crate::task::{Task, TaskStatus};

/// Default display format for times in rows (seconds precision).
pub const DISPLAY_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One task with its paired steps.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskReport {
    pub id: i64,
    pub name: String,
    pub params: String,
    pub status: TaskStatus,
    pub start_time: NaiveDateTime,
    pub end_time: Option<NaiveDateTime>,
    pub duration_seconds: Option<f64>,
    pub intervals: Vec<StepInterval>,
    pub pairing: PairingSummary,
}

impl TaskReport {
    pub fn from_task(task: &Task) -> Self {
        let intervals = pair_steps(&task.steps);
        let pairing = PairingSummary::of(&intervals);
        Self {
            id: task.id,
            name: task.name.clone(),
            params: task.params.clone(),
            status: task.status.clone(),
            start_time: task.start_time,
            end_time: task.end_time,
            duration_seconds: task.duration_seconds(),
            intervals,
            pairing,
        }
    }

    /// Status label for listings. Open and dangling tasks read `incomplete`.
    pub fn status_label(&self) -> String {
        if self.end_time.is_none() {
            "incomplete".to_string()
        } else {
            self.status.to_string()
        }
    }

    pub fn task_row(&self, time_format: &str) -> TaskRow {
        TaskRow {
            id: self.id,
            name: self.name.clone(),
            status: self.status_label(),
            start: self.start_time.format(time_format).to_string(),
            end: format_time(self.end_time, time_format),
            duration: format_seconds(self.duration_seconds),
        }
    }

    pub fn step_rows(&self, time_format: &str) -> Vec<StepRow> {
        self.intervals
            .iter()
            .map(|interval| StepRow::new(interval, time_format))
            .collect()
    }
}

/// Pairs every task of a parse pass.
///
/// Tasks are independent, so pairing runs in parallel; output keeps task order.
pub fn build_reports(log: &TaskLog) -> Vec<TaskReport> {
    log.tasks().par_iter().map(TaskReport::from_task).collect()
}

/// Task listing row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskRow {
    #[serde(rename = "Task ID")]
    pub id: i64,
    #[serde(rename = "Task Name")]
    pub name: String,
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "Start Time")]
    pub start: String,
    #[serde(rename = "End Time")]
    pub end: String,
    #[serde(rename = "Duration (s)")]
    pub duration: String,
}

/// Step table row. Serialized field names are the export column headers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepRow {
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Start Time")]
    pub start: String,
    #[serde(rename = "End Time")]
    pub end: String,
    #[serde(rename = "Duration (sec)")]
    pub duration: String,
    /// Rows mentioning an error are highlighted by presenters.
    #[serde(skip)]
    pub is_error: bool,
}

impl StepRow {
    pub fn new(interval: &StepInterval, time_format: &str) -> Self {
        Self {
            description: interval.description.clone(),
            start: format_time(interval.start_time, time_format),
            end: format_time(interval.end_time, time_format),
            duration: format_seconds(interval.duration_seconds),
            is_error: interval.description.to_lowercase().contains("error"),
        }
    }
}

fn format_time(time: Option<NaiveDateTime>, time_format: &str) -> String {
    time.map(|t| t.format(time_format).to_string())
        .unwrap_or_default()
}

fn format_seconds(seconds: Option<f64>) -> String {
    seconds.map(|s| format!("{s:.2}")).unwrap_or_default()
}
