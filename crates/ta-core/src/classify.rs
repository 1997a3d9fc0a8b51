//! Line classification.
//!
//! Turns one raw log line into a typed [`LogEvent`], or drops it. Patterns are
//! tried in a fixed priority order and the first match wins:
//!
//! 1. task start (`START_RUN manual task`)
//! 2. task end, success (`END_RUN Task <name> completed successfully`)
//! 3. task end, error (`END_RUN task ... failed with error ... task_id <id>`)
//! 4. alarm from host (`receive alarm from HOST:`)
//! 5. error handling (`Handle...`)
//! 6. step start (`<marker> START <desc>`)
//! 7. step end (`<marker> END <desc>`)
//!
//! Lines without the channel marker are rejected before any pattern is tried.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::event::{EventKind, LogEvent};
use crate::event_type::{StepPhase, Worker};
use crate::extract::{clean_description, extract_numeric_params, format_params, parse_timestamp};

static ANSI_ESCAPE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[[0-9;]*[a-zA-Z]").unwrap());

static TASK_START_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"START_RUN manual task.*'task': '([^']+)',.*'task_id': (\d+)").unwrap()
});

static TASK_END_SUCCESS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"END_RUN Task (\w+) completed successfully").unwrap());

static TASK_END_ERROR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"END_RUN task .* failed with error .* task_id (\d+)").unwrap()
});

static ALARM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"receive alarm from HOST: (.*)").unwrap());

static ERROR_HANDLING_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"Handle(.*)").unwrap());

static DEFAULT_CLASSIFIER: LazyLock<LineClassifier> = LazyLock::new(LineClassifier::default);

/// Default log-channel marker of the analysis subsystem.
pub const DEFAULT_CHANNEL_MARKER: &str = "ANALYSE -";

/// Parser settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseConfig {
    /// Literal text every analysis-relevant line contains.
    /// Default: `"ANALYSE -"`.
    pub channel_marker: String,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            channel_marker: DEFAULT_CHANNEL_MARKER.to_string(),
        }
    }
}

/// Removes terminal color escape sequences.
pub fn strip_ansi(line: &str) -> Cow<'_, str> {
    ANSI_ESCAPE_RE.replace_all(line, "")
}

/// Classifies lines against the recognized pattern set.
#[derive(Debug, Clone)]
pub struct LineClassifier {
    config: ParseConfig,
    step_start_token: String,
    step_end_token: String,
}

impl Default for LineClassifier {
    fn default() -> Self {
        Self::new(ParseConfig::default())
    }
}

impl LineClassifier {
    pub fn new(config: ParseConfig) -> Self {
        let step_start_token = format!("{} START ", config.channel_marker);
        let step_end_token = format!("{} END ", config.channel_marker);
        Self {
            config,
            step_start_token,
            step_end_token,
        }
    }

    pub const fn config(&self) -> &ParseConfig {
        &self.config
    }

    /// Classifies one raw line. Pure: the same line always yields the same result.
    pub fn classify(&self, line: &str) -> Option<LogEvent> {
        let text = strip_ansi(line);
        if !text.contains(self.config.channel_marker.as_str()) {
            return None;
        }

        let Some(kind) = self.match_kind(&text) else {
            tracing::trace!(line = %text, "no pattern matched");
            return None;
        };

        let Some(timestamp) = parse_timestamp(&text) else {
            tracing::trace!(line = %text, kind = kind.name(), "dropping line without valid timestamp");
            return None;
        };

        Some(LogEvent {
            timestamp,
            kind,
            raw_text: text.trim_end().to_string(),
        })
    }

    fn match_kind(&self, text: &str) -> Option<EventKind> {
        if let Some(caps) = TASK_START_RE.captures(text) {
            return Some(EventKind::TaskStart {
                task_id: caps[2].parse().ok()?,
                name: caps[1].to_string(),
                params: params_block(text).to_string(),
            });
        }

        if let Some(caps) = TASK_END_SUCCESS_RE.captures(text) {
            return Some(EventKind::TaskEndSuccess {
                name: caps[1].to_string(),
            });
        }

        if let Some(caps) = TASK_END_ERROR_RE.captures(text) {
            return Some(EventKind::TaskEndError {
                task_id: caps[1].parse().ok()?,
                detail: error_detail(text).to_string(),
            });
        }

        if let Some(caps) = ALARM_RE.captures(text) {
            return Some(EventKind::Alarm {
                description: format!("ALARM FROM HOST: {}", clean_description(&caps[1])),
            });
        }

        if let Some(caps) = ERROR_HANDLING_RE.captures(text) {
            let phase = if text.contains("SUCCESS") {
                StepPhase::End
            } else {
                StepPhase::Start
            };
            return Some(EventKind::ErrorHandling {
                description: format!("ERROR HANDLING {}", clean_description(&caps[1])),
                phase,
            });
        }

        if let Some(rest) = text_after(text, &self.step_start_token) {
            let worker = Worker::from_line(text);
            let mut description = clean_description(rest).to_string();
            let mut numeric_params = Vec::new();
            // Maestro reuses step names across calls; the arguments tell them apart.
            if worker == Worker::Maestro {
                if let Some(params) = extract_numeric_params(rest).filter(|p| !p.is_empty()) {
                    description.push(' ');
                    description.push_str(&format_params(&params));
                    numeric_params = params;
                }
            }
            return Some(EventKind::StepStart {
                worker,
                description,
                numeric_params,
            });
        }

        if let Some(rest) = text_after(text, &self.step_end_token) {
            return Some(EventKind::StepEnd {
                description: clean_description(rest).to_string(),
            });
        }

        None
    }
}

/// Classifies a line with the default channel marker.
pub fn classify_line(line: &str) -> Option<LogEvent> {
    DEFAULT_CLASSIFIER.classify(line)
}

fn text_after<'a>(text: &'a str, token: &str) -> Option<&'a str> {
    let idx = text.find(token)?;
    let rest = &text[idx + token.len()..];
    (!rest.trim().is_empty()).then_some(rest)
}

/// Raw text between `'params': {` and `}, 'task_id'`; empty when absent.
fn params_block(text: &str) -> &str {
    text.split_once("'params': {").map_or("", |(_, rest)| {
        rest.split_once("}, 'task_id").map_or(rest, |(params, _)| params)
    })
}

/// Text between `failed with error` and `task_id`.
fn error_detail(text: &str) -> &str {
    text.split_once("failed with error").map_or("", |(_, rest)| {
        rest.split_once("task_id").map_or(rest, |(detail, _)| detail).trim()
    })
}
