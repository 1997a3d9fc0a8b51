//! Core reconstruction engine for the task analyser.
//!
//! This crate turns a robot controller's colored text log into tasks and
//! timed steps:
//! - Classification: raw line to typed [`LogEvent`]
//! - Reconstruction: events to [`Task`]s with their step events
//! - Pairing: step events to [`StepInterval`]s with durations
//! - Reports: per-task rows for presentation layers

pub mod classify;
pub mod event;
pub mod event_type;
pub mod extract;
pub mod normalize;
pub mod pairing;
pub mod reconstruct;
pub mod report;
pub mod task;

pub use classify::{LineClassifier, ParseConfig, classify_line, strip_ansi};
pub use event::{EventKind, LogEvent};
pub use event_type::{StepPhase, UnknownValue, Worker};
pub use normalize::normalize_step;
pub use pairing::{PairStatus, PairingSummary, StepInterval, pair_steps};
pub use reconstruct::{LogError, ParseStats, TaskLog, TaskReconstructor, parse_lines, parse_log_file};
pub use report::{DISPLAY_TIME_FORMAT, StepRow, TaskReport, TaskRow, build_reports};
pub use task::{StepEvent, Task, TaskStatus};
