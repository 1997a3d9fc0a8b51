//! Classified log events.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::event_type::{StepPhase, Worker};

/// One log line that matched a recognized pattern.
///
/// Events are immutable once the classifier has produced them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
    /// When the line was written, to the millisecond.
    pub timestamp: NaiveDateTime,
    /// What the line reports, with the payload meaningful for that kind.
    pub kind: EventKind,
    /// The line after escape codes were stripped.
    pub raw_text: String,
}

/// The kind of a classified line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    /// A manual task was started.
    TaskStart {
        task_id: i64,
        name: String,
        /// Raw text of the `'params'` block, not evaluated.
        params: String,
    },
    /// A task finished successfully. Carries only the task name.
    TaskEndSuccess { name: String },
    /// A task failed. Carries the explicit id and the error text.
    TaskEndError { task_id: i64, detail: String },
    /// A worker reported the start of a step.
    StepStart {
        worker: Worker,
        description: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        numeric_params: Vec<i64>,
    },
    /// A worker reported the end of a step.
    StepEnd { description: String },
    /// The host raised an alarm.
    Alarm { description: String },
    /// The error handler started or finished handling something.
    ErrorHandling {
        description: String,
        phase: StepPhase,
    },
}

impl EventKind {
    /// Stable snake-case name of the kind, used in logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::TaskStart { .. } => "task_start",
            Self::TaskEndSuccess { .. } => "task_end_success",
            Self::TaskEndError { .. } => "task_end_error",
            Self::StepStart { .. } => "step_start",
            Self::StepEnd { .. } => "step_end",
            Self::Alarm { .. } => "alarm",
            Self::ErrorHandling { .. } => "error_handling",
        }
    }
}

impl LogEvent {
    /// The worker this event is attributed to, if any.
    ///
    /// Step ends carry no worker; alarms and error handling belong to `som`.
    #[must_use]
    pub const fn worker(&self) -> Option<Worker> {
        match &self.kind {
            EventKind::StepStart { worker, .. } => Some(*worker),
            EventKind::Alarm { .. } | EventKind::ErrorHandling { .. } => Some(Worker::Som),
            _ => None,
        }
    }

    /// The step description, for step-like events.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        match &self.kind {
            EventKind::StepStart { description, .. }
            | EventKind::StepEnd { description }
            | EventKind::Alarm { description }
            | EventKind::ErrorHandling { description, .. } => Some(description),
            _ => None,
        }
    }

    /// Integer arguments captured from a maestro step start.
    #[must_use]
    pub fn numeric_params(&self) -> &[i64] {
        match &self.kind {
            EventKind::StepStart { numeric_params, .. } => numeric_params,
            _ => &[],
        }
    }

    /// Whether this event opens or closes a step, for step-like events.
    #[must_use]
    pub const fn step_phase(&self) -> Option<StepPhase> {
        match &self.kind {
            EventKind::StepStart { .. } | EventKind::Alarm { .. } => Some(StepPhase::Start),
            EventKind::StepEnd { .. } => Some(StepPhase::End),
            EventKind::ErrorHandling { phase, .. } => Some(*phase),
            _ => None,
        }
    }

    pub const fn kind_name(&self) -> &'static str {
        self.kind.name()
    }
}
