//! Task reconstruction from the classified event stream.
//!
//! A single left-to-right pass: task starts open a task, step events are
//! appended to the open task, and task ends close whichever task they
//! resolve to. Nothing is backtracked, merged or split.

use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::Serialize;
use thiserror::Error;

use crate::classify::{LineClassifier, ParseConfig};
use crate::event::{EventKind, LogEvent};
use crate::event_type::{StepPhase, Worker};
use crate::task::{StepEvent, Task, TaskStatus};

/// Buffer size for `BufReader` (64KB; controller logs run to several megabytes).
const BUFFER_SIZE: usize = 64 * 1024;

/// File-level failures. Line-level problems never surface here.
#[derive(Debug, Error)]
pub enum LogError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{} is not valid UTF-8 (line {line})", path.display())]
    Encoding { path: PathBuf, line: usize },
}

/// Counters collected during one parse pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ParseStats {
    pub lines: usize,
    pub events: usize,
    /// Step events seen while no task was open.
    pub dropped_steps: usize,
    /// Task ends that resolved to no task.
    pub unresolved_ends: usize,
    /// Task ends stamped before their task's start.
    pub rejected_ends: usize,
}

/// Whether a task is currently receiving step events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconstructorState {
    Idle,
    /// Index of the open task in creation order.
    Open(usize),
}

/// The tasks of one parse pass, in creation order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TaskLog {
    tasks: Vec<Task>,
    stats: ParseStats,
}

impl TaskLog {
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn into_tasks(self) -> Vec<Task> {
        self.tasks
    }

    pub const fn stats(&self) -> ParseStats {
        self.stats
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// The most recent task with this id.
    pub fn find(&self, id: i64) -> Option<&Task> {
        self.tasks.iter().rev().find(|t| t.id == id)
    }

    /// Every task that used this id, oldest first.
    pub fn find_all(&self, id: i64) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(move |t| t.id == id)
    }
}

/// Builds the task table from events fed in log order.
///
/// A fresh reconstructor is used per file; no state survives between parses.
#[derive(Debug)]
pub struct TaskReconstructor {
    tasks: Vec<Task>,
    state: ReconstructorState,
    stats: ParseStats,
}

impl Default for TaskReconstructor {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskReconstructor {
    pub const fn new() -> Self {
        Self {
            tasks: Vec::new(),
            state: ReconstructorState::Idle,
            stats: ParseStats {
                lines: 0,
                events: 0,
                dropped_steps: 0,
                unresolved_ends: 0,
                rejected_ends: 0,
            },
        }
    }

    pub const fn state(&self) -> ReconstructorState {
        self.state
    }

    /// Counts a raw line that went through the classifier.
    pub fn record_line(&mut self) {
        self.stats.lines += 1;
    }

    /// Applies one event to the task table.
    pub fn feed(&mut self, event: LogEvent) {
        self.stats.events += 1;
        let timestamp = event.timestamp;

        match event.kind {
            EventKind::TaskStart {
                task_id,
                name,
                params,
            } => {
                if let ReconstructorState::Open(index) = self.state {
                    let previous = &self.tasks[index];
                    tracing::debug!(
                        task_id = previous.id,
                        name = %previous.name,
                        "task left dangling by a new task start"
                    );
                }
                self.tasks.push(Task::new(task_id, name, params, timestamp));
                self.state = ReconstructorState::Open(self.tasks.len() - 1);
            }
            EventKind::TaskEndSuccess { name } => {
                // First match wins, even when a same-named task is open later.
                let index = self
                    .tasks
                    .iter()
                    .position(|t| t.name == name && t.status.is_unknown());
                match index {
                    Some(index) => self.close(index, timestamp, TaskStatus::Success),
                    None => {
                        self.stats.unresolved_ends += 1;
                        tracing::debug!(%name, "success end matches no unfinished task");
                    }
                }
            }
            EventKind::TaskEndError { task_id, detail } => {
                match self.tasks.iter().rposition(|t| t.id == task_id) {
                    Some(index) => self.close(index, timestamp, TaskStatus::Error { detail }),
                    None => {
                        self.stats.unresolved_ends += 1;
                        tracing::debug!(task_id, "error end for unknown task id");
                    }
                }
            }
            kind => self.append_step(timestamp, kind, event.raw_text),
        }
    }

    fn append_step(&mut self, time: NaiveDateTime, kind: EventKind, raw_text: String) {
        let ReconstructorState::Open(index) = self.state else {
            self.stats.dropped_steps += 1;
            tracing::debug!(kind = kind.name(), line = %raw_text, "step event outside any task");
            return;
        };

        let step = match kind {
            EventKind::StepStart {
                worker,
                description,
                numeric_params,
            } => StepEvent {
                phase: StepPhase::Start,
                worker: Some(worker),
                description,
                numeric_params,
                time,
                raw_text,
            },
            EventKind::StepEnd { description } => StepEvent {
                phase: StepPhase::End,
                worker: None,
                description,
                numeric_params: Vec::new(),
                time,
                raw_text,
            },
            EventKind::Alarm { description } => StepEvent {
                phase: StepPhase::Start,
                worker: Some(Worker::Som),
                description,
                numeric_params: Vec::new(),
                time,
                raw_text,
            },
            EventKind::ErrorHandling { description, phase } => StepEvent {
                phase,
                worker: Some(Worker::Som),
                description,
                numeric_params: Vec::new(),
                time,
                raw_text,
            },
            EventKind::TaskStart { .. }
            | EventKind::TaskEndSuccess { .. }
            | EventKind::TaskEndError { .. } => return,
        };

        self.tasks[index].steps.push(step);
    }

    fn close(&mut self, index: usize, end: NaiveDateTime, status: TaskStatus) {
        let task = &mut self.tasks[index];
        if end < task.start_time {
            self.stats.rejected_ends += 1;
            tracing::warn!(
                task_id = task.id,
                start = %task.start_time,
                end = %end,
                "ignoring task end stamped before its start"
            );
            return;
        }

        task.end_time = Some(end);
        task.status = status;

        if self.state == ReconstructorState::Open(index) {
            self.state = ReconstructorState::Idle;
        }
    }

    /// Finishes the pass. Tasks still open stay without an end time.
    pub fn finish(self) -> TaskLog {
        if let ReconstructorState::Open(index) = self.state {
            tracing::debug!(task_id = self.tasks[index].id, "log ended with a task open");
        }
        TaskLog {
            tasks: self.tasks,
            stats: self.stats,
        }
    }
}

/// Reconstructs tasks from in-memory lines.
pub fn parse_lines<I, S>(lines: I, classifier: &LineClassifier) -> TaskLog
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut reconstructor = TaskReconstructor::new();
    for line in lines {
        reconstructor.record_line();
        if let Some(event) = classifier.classify(line.as_ref()) {
            reconstructor.feed(event);
        }
    }
    reconstructor.finish()
}

/// Reads and reconstructs one log file.
///
/// An unreadable file or invalid UTF-8 fails the whole parse.
pub fn parse_log_file(path: &Path, config: &ParseConfig) -> Result<TaskLog, LogError> {
    let file = File::open(path).map_err(|source| LogError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let reader = BufReader::with_capacity(BUFFER_SIZE, file);
    let classifier = LineClassifier::new(config.clone());
    let mut reconstructor = TaskReconstructor::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err(|source| {
            if source.kind() == ErrorKind::InvalidData {
                LogError::Encoding {
                    path: path.to_path_buf(),
                    line: index + 1,
                }
            } else {
                LogError::Read {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;

        reconstructor.record_line();
        if let Some(event) = classifier.classify(&line) {
            reconstructor.feed(event);
        }
    }

    let log = reconstructor.finish();
    let stats = log.stats();
    tracing::debug!(
        path = %path.display(),
        lines = stats.lines,
        events = stats.events,
        tasks = log.len(),
        dropped_steps = stats.dropped_steps,
        "parsed log file"
    );
    Ok(log)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn task_start(time: &str, name: &str, id: i64) -> String {
        format!(
            "2025-05-11 {time},000 - mmu1 - ANALYSE - START_RUN manual task {{'task': '{name}', 'params': {{}}, 'task_id': {id}}}"
        )
    }

    fn analyse(time: &str, body: &str) -> String {
        format!("2025-05-11 {time},000 - mmu1 - ANALYSE - {body}")
    }

    fn parse(lines: &[String]) -> TaskLog {
        parse_lines(lines, &LineClassifier::default())
    }

    #[test]
    fn builds_task_with_steps_and_success_end() {
        let log = parse(&[
            task_start("17:06:00", "dock", 42),
            analyse("17:06:05", "START wait for maestro to complete docking (10,20) (file.py:1)"),
            analyse("17:06:09", "END maestro task - docking completed successfully (file.py:2)"),
            analyse("17:06:10", "END_RUN Task dock completed successfully"),
        ]);

        assert_eq!(log.len(), 1);
        let task = &log.tasks()[0];
        assert_eq!(task.id, 42);
        assert_eq!(task.name, "dock");
        assert_eq!(task.status, TaskStatus::Success);
        assert_eq!(task.steps.len(), 2);
        assert_eq!(task.steps[0].phase, StepPhase::Start);
        assert_eq!(task.steps[0].worker, Some(Worker::Maestro));
        assert_eq!(task.steps[0].numeric_params, vec![10, 20]);
        assert_eq!(task.steps[1].phase, StepPhase::End);
        assert_eq!(task.steps[1].worker, None);
    }

    #[test]
    fn second_start_leaves_first_task_dangling() {
        let log = parse(&[
            task_start("17:06:00", "dock", 1),
            analyse("17:06:01", "START move arm"),
            task_start("17:07:00", "undock", 2),
            analyse("17:07:01", "START lift tray"),
        ]);

        assert_eq!(log.len(), 2);
        assert_eq!(log.tasks()[0].end_time, None);
        assert!(log.tasks()[0].status.is_unknown());
        assert_eq!(log.tasks()[0].steps.len(), 1);
        assert_eq!(log.tasks()[1].steps.len(), 1);
        assert_eq!(log.tasks()[1].steps[0].description, "lift tray");
    }

    #[test]
    fn steps_while_idle_are_dropped() {
        let log = parse(&[
            analyse("17:05:00", "START move arm"),
            task_start("17:06:00", "dock", 1),
            analyse("17:06:10", "END_RUN Task dock completed successfully"),
            analyse("17:06:11", "END move arm"),
        ]);

        assert!(log.tasks()[0].steps.is_empty());
        assert_eq!(log.stats().dropped_steps, 2);
    }

    #[test]
    fn error_end_resolves_by_id() {
        let log = parse(&[
            task_start("17:06:00", "dock", 7),
            analyse(
                "17:06:30",
                "END_RUN task dock failed with error gripper timeout task_id 7",
            ),
        ]);

        let task = log.find(7).unwrap();
        assert_eq!(
            task.status,
            TaskStatus::Error {
                detail: "gripper timeout".into()
            }
        );
        assert!(task.is_complete());
    }

    #[test]
    fn success_end_resolves_first_unfinished_task_with_name() {
        let mut reconstructor = TaskReconstructor::new();
        let classifier = LineClassifier::default();
        for line in [
            task_start("17:00:00", "dock", 1),
            task_start("17:01:00", "dock", 2),
        ] {
            reconstructor.feed(classifier.classify(&line).unwrap());
        }
        assert_eq!(reconstructor.state(), ReconstructorState::Open(1));

        let end = analyse("17:02:00", "END_RUN Task dock completed successfully");
        reconstructor.feed(classifier.classify(&end).unwrap());
        // The dangling first task is closed; the second stays open.
        assert_eq!(reconstructor.state(), ReconstructorState::Open(1));

        let log = reconstructor.finish();
        assert_eq!(log.tasks()[0].status, TaskStatus::Success);
        assert!(log.tasks()[1].status.is_unknown());
    }

    #[test]
    fn closing_open_task_returns_to_idle() {
        let mut reconstructor = TaskReconstructor::new();
        let classifier = LineClassifier::default();
        reconstructor.feed(classifier.classify(&task_start("17:00:00", "dock", 1)).unwrap());
        let end = analyse("17:00:05", "END_RUN Task dock completed successfully");
        reconstructor.feed(classifier.classify(&end).unwrap());

        assert_eq!(reconstructor.state(), ReconstructorState::Idle);
    }

    #[test]
    fn end_before_start_is_rejected() {
        let log = parse(&[
            task_start("17:06:00", "dock", 1),
            analyse("17:05:00", "END_RUN Task dock completed successfully"),
        ]);

        assert!(!log.tasks()[0].is_complete());
        assert_eq!(log.stats().rejected_ends, 1);
    }

    #[test]
    fn unresolved_ends_are_counted() {
        let log = parse(&[
            analyse("17:05:00", "END_RUN Task dock completed successfully"),
            analyse("17:05:01", "END_RUN task x failed with error boom task_id 9"),
        ]);

        assert!(log.is_empty());
        assert_eq!(log.stats().unresolved_ends, 2);
    }

    #[test]
    fn reused_ids_keep_every_record() {
        let log = parse(&[
            task_start("17:00:00", "dock", 5),
            analyse("17:00:10", "END_RUN Task dock completed successfully"),
            task_start("17:01:00", "undock", 5),
        ]);

        assert_eq!(log.find_all(5).count(), 2);
        assert_eq!(log.find(5).unwrap().name, "undock");
    }

    #[test]
    fn alarm_and_error_handling_become_som_steps() {
        let log = parse(&[
            task_start("17:00:00", "dock", 1),
            analyse("17:00:01", "receive alarm from HOST: door open"),
            analyse("17:00:02", "Handle door alarm"),
            analyse("17:00:03", "Handle door alarm SUCCESS"),
        ]);

        let steps = &log.tasks()[0].steps;
        assert_eq!(steps.len(), 3);
        assert!(steps.iter().all(|s| s.worker == Some(Worker::Som)));
        assert_eq!(steps[0].phase, StepPhase::Start);
        assert_eq!(steps[1].phase, StepPhase::Start);
        assert_eq!(steps[2].phase, StepPhase::End);
    }

    #[test]
    fn parse_log_file_reads_lines() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", task_start("17:06:00", "dock", 42)).unwrap();
        writeln!(file, "unrelated noise").unwrap();
        writeln!(
            file,
            "{}",
            analyse("17:06:10", "END_RUN Task dock completed successfully")
        )
        .unwrap();

        let log = parse_log_file(file.path(), &ParseConfig::default()).unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log.stats().lines, 3);
        assert_eq!(log.stats().events, 2);
    }

    #[test]
    fn parse_log_file_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = parse_log_file(&dir.path().join("missing.log"), &ParseConfig::default())
            .unwrap_err();
        assert!(matches!(err, LogError::Read { .. }));
    }

    #[test]
    fn parse_log_file_reports_bad_encoding() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "fine").unwrap();
        file.write_all(&[0xff, 0xfe, b'\n']).unwrap();

        let err = parse_log_file(file.path(), &ParseConfig::default()).unwrap_err();
        assert!(matches!(err, LogError::Encoding { line: 2, .. }));
    }

    #[test]
    fn parsing_twice_is_identical() {
        let lines = [
            task_start("17:06:00", "dock", 42),
            analyse("17:06:05", "START wait for mtc task pick (1)"),
            task_start("17:07:00", "dock", 43),
        ];
        assert_eq!(parse(&lines), parse(&lines));
    }
}
