//! Tasks - top-level jobs bounded by a start and an end line.

use std::fmt;

use chrono::{NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};

use crate::event_type::{StepPhase, Worker};

/// Outcome of a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TaskStatus {
    /// No end line has been seen yet.
    #[default]
    Unknown,
    Success,
    Error {
        /// Error text reported on the end line.
        detail: String,
    },
}

impl TaskStatus {
    pub const fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => f.write_str("unknown"),
            Self::Success => f.write_str("success"),
            Self::Error { detail } => write!(f, "ERROR {detail}"),
        }
    }
}

/// A step event attributed to a task, ready for pairing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepEvent {
    pub phase: StepPhase,
    /// Emitting worker. Step ends carry none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker: Option<Worker>,
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub numeric_params: Vec<i64>,
    pub time: NaiveDateTime,
    pub raw_text: String,
}

/// One top-level job reconstructed from the log.
///
/// `id` is assigned by the controller and may be reused within one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub name: String,
    /// Raw text of the params block. See [`Task::param_pairs`].
    pub params: String,
    pub start_time: NaiveDateTime,
    /// Unset while the task is open or when it was left dangling.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<NaiveDateTime>,
    #[serde(default)]
    pub status: TaskStatus,
    /// Step events in log order.
    #[serde(default)]
    pub steps: Vec<StepEvent>,
}

impl Task {
    /// Creates an open task with no steps.
    pub const fn new(id: i64, name: String, params: String, start_time: NaiveDateTime) -> Self {
        Self {
            id,
            name,
            params,
            start_time,
            end_time: None,
            status: TaskStatus::Unknown,
            steps: Vec::new(),
        }
    }

    /// Whether an end line closed this task.
    pub const fn is_complete(&self) -> bool {
        self.end_time.is_some()
    }

    /// Wall-clock duration in seconds, rounded to two decimals.
    pub fn duration_seconds(&self) -> Option<f64> {
        self.end_time
            .map(|end| round_seconds(end - self.start_time))
    }

    /// Splits the params blob into `(key, value)` pairs.
    ///
    /// Only top-level commas separate pairs; quotes around keys and string
    /// values are removed, nested `{...}`/`[...]` values are kept verbatim.
    /// Nothing in the blob is evaluated.
    pub fn param_pairs(&self) -> Vec<(String, String)> {
        parse_param_pairs(&self.params)
    }
}

/// Rounds a time delta to seconds with two decimals.
///
/// Half a centisecond rounds to the even neighbour, so 125 ms gives `0.12`
/// and 135 ms gives `0.14`.
#[allow(clippy::cast_precision_loss)]
pub fn round_seconds(delta: TimeDelta) -> f64 {
    let millis = delta.num_milliseconds();
    let mut centis = millis.div_euclid(10);
    let rest = millis.rem_euclid(10);
    if rest > 5 || (rest == 5 && centis % 2 != 0) {
        centis += 1;
    }
    centis as f64 / 100.0
}

fn unquote(s: &str) -> &str {
    let s = s.trim();
    s.strip_prefix('\'')
        .and_then(|inner| inner.strip_suffix('\''))
        .or_else(|| s.strip_prefix('"').and_then(|inner| inner.strip_suffix('"')))
        .unwrap_or(s)
}

fn split_top_level(text: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (i, c) in text.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '{' | '[' | '(') => depth += 1,
            (None, '}' | ']' | ')') => depth = depth.saturating_sub(1),
            (None, c) if c == sep && depth == 0 => {
                parts.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

fn parse_param_pairs(params: &str) -> Vec<(String, String)> {
    split_top_level(params, ',')
        .into_iter()
        .filter_map(|item| {
            let parts = split_top_level(item, ':');
            if parts.len() < 2 {
                return None;
            }
            let key = unquote(parts[0]);
            if key.is_empty() {
                return None;
            }
            // Everything after the first top-level ':' is the value, nested ':' included.
            let value = &item[parts[0].len() + 1..];
            Some((key.to_string(), unquote(value).to_string()))
        })
        .collect()
}
