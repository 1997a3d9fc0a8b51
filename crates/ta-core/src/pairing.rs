//! Step pairing.
//!
//! Matches each step end to an open step start of the same task and turns
//! the pairs into [`StepInterval`]s with a duration.
//!
//! # Matching
//!
//! Open starts are kept in log order and probed newest first. An end closes
//! the first probed start whose normalized key contains the end's normalized
//! key. Probing newest first approximates nesting for retried steps with the
//! same name; two same-named steps truly interleaved across workers can be
//! mis-paired, and that is accepted.
//!
//! Ends that close nothing and starts left open are reported as unmatched
//! intervals rather than dropped.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::event_type::{StepPhase, Worker};
use crate::extract::format_params;
use crate::normalize::{keys_match, normalize_step};
use crate::task::{StepEvent, round_seconds};

/// How an interval came out of pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairStatus {
    Matched,
    /// A start no end closed.
    UnmatchedStart,
    /// An end that closed no start.
    UnmatchedEnd,
    /// A pair whose end is stamped before its start. Carries no duration.
    NegativeDuration,
}

/// A paired (or half-paired) step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepInterval {
    pub description: String,
    pub start_time: Option<NaiveDateTime>,
    pub end_time: Option<NaiveDateTime>,
    /// Seconds between start and end, rounded to two decimals. Only set
    /// for [`PairStatus::Matched`].
    pub duration_seconds: Option<f64>,
    pub status: PairStatus,
}

impl StepInterval {
    fn paired(start: &StepEvent, end: &StepEvent) -> Self {
        let description = synthesize_description(start, end);
        if end.time < start.time {
            tracing::warn!(
                %description,
                start = %start.time,
                end = %end.time,
                "step end precedes its start"
            );
            return Self {
                description,
                start_time: Some(start.time),
                end_time: Some(end.time),
                duration_seconds: None,
                status: PairStatus::NegativeDuration,
            };
        }

        Self {
            description,
            start_time: Some(start.time),
            end_time: Some(end.time),
            duration_seconds: Some(round_seconds(end.time - start.time)),
            status: PairStatus::Matched,
        }
    }

    fn unmatched_start(start: &StepEvent) -> Self {
        Self {
            description: start.description.clone(),
            start_time: Some(start.time),
            end_time: None,
            duration_seconds: None,
            status: PairStatus::UnmatchedStart,
        }
    }

    fn unmatched_end(end: &StepEvent) -> Self {
        Self {
            description: end.description.clone(),
            start_time: None,
            end_time: Some(end.time),
            duration_seconds: None,
            status: PairStatus::UnmatchedEnd,
        }
    }

    /// Ordering key: start time, else end time.
    pub fn sort_time(&self) -> Option<NaiveDateTime> {
        self.start_time.or(self.end_time)
    }

    /// Whether both a start and an end were found.
    pub const fn is_paired(&self) -> bool {
        matches!(
            self.status,
            PairStatus::Matched | PairStatus::NegativeDuration
        )
    }
}

/// Builds the display label of a matched pair.
///
/// Maestro labels keep the diagnostic parameters captured at step start;
/// every other worker uses the end description as is.
pub fn synthesize_description(start: &StepEvent, end: &StepEvent) -> String {
    if start.worker != Some(Worker::Maestro) {
        return end.description.clone();
    }

    if end.description.contains("completed successfully") {
        let name = start.description.split("complete").nth(1).unwrap_or("");
        return format!("maestro end {name} task successfully");
    }

    let mut parts = end.description.split("with error");
    if let (Some(preamble), Some(detail)) = (parts.next(), parts.next()) {
        let params = format_params(&start.numeric_params);
        return format!("{preamble} {params} {detail}");
    }

    end.description.clone()
}

struct OpenStart<'a> {
    event: &'a StepEvent,
    key: String,
}

/// Pairs one task's step events.
///
/// The result is ordered by start time (end time for unmatched ends); ties
/// keep emission order.
pub fn pair_steps(steps: &[StepEvent]) -> Vec<StepInterval> {
    let mut open: Vec<OpenStart<'_>> = Vec::new();
    let mut intervals = Vec::with_capacity(steps.len());

    for step in steps {
        let key = normalize_step(&step.description);
        match step.phase {
            StepPhase::Start => open.push(OpenStart { event: step, key }),
            StepPhase::End => {
                let candidate = open
                    .iter()
                    .rposition(|start| keys_match(&start.key, &key));
                match candidate {
                    Some(index) => {
                        let start = open.remove(index);
                        intervals.push(StepInterval::paired(start.event, step));
                    }
                    None => {
                        tracing::debug!(description = %step.description, %key, "unmatched step end");
                        intervals.push(StepInterval::unmatched_end(step));
                    }
                }
            }
        }
    }

    intervals.extend(
        open.into_iter()
            .map(|start| StepInterval::unmatched_start(start.event)),
    );
    intervals.sort_by_key(StepInterval::sort_time);
    intervals
}

/// Interval counts of one pairing run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PairingSummary {
    pub matched: usize,
    pub negative: usize,
    pub unmatched_starts: usize,
    pub unmatched_ends: usize,
}

impl PairingSummary {
    pub fn of(intervals: &[StepInterval]) -> Self {
        let mut summary = Self::default();
        for interval in intervals {
            match interval.status {
                PairStatus::Matched => summary.matched += 1,
                PairStatus::NegativeDuration => summary.negative += 1,
                PairStatus::UnmatchedStart => summary.unmatched_starts += 1,
                PairStatus::UnmatchedEnd => summary.unmatched_ends += 1,
            }
        }
        summary
    }

    /// Number of step events these intervals account for.
    pub const fn events(&self) -> usize {
        2 * (self.matched + self.negative) + self.unmatched_starts + self.unmatched_ends
    }
}
