//! Tasks command for listing the tasks of a log file.
//!
//! This module implements `ta tasks` with human-readable and JSON output.

use std::io::Write;
use std::path::Path;

use anyhow::Result;
use ta_core::{TaskReport, TaskRow};

use super::util::{load_reports, push_line};
use crate::Config;

fn format_row(id: &str, name: &str, status: &str, start: &str, end: &str, duration: &str) -> String {
    format!("{id:<8}  {name:<16}  {status:<12}  {start:<19}  {end:<19}  {duration:>8}")
}

/// Formats the task listing.
pub fn format_tasks(rows: &[TaskRow]) -> String {
    let mut output = String::new();

    if rows.is_empty() {
        push_line(&mut output, "No tasks found.");
        return output;
    }

    push_line(
        &mut output,
        &format_row("TASK ID", "NAME", "STATUS", "START", "END", "DURATION"),
    );
    for row in rows {
        push_line(
            &mut output,
            &format_row(
                &row.id.to_string(),
                &row.name,
                &row.status,
                &row.start,
                &row.end,
                &row.duration,
            ),
        );
    }

    let incomplete = rows.iter().filter(|r| r.end.is_empty()).count();
    push_line(&mut output, "");
    push_line(
        &mut output,
        &format!("{} tasks, {incomplete} incomplete", rows.len()),
    );
    output
}

/// Formats the task listing as JSON.
pub fn format_tasks_json(rows: &[TaskRow]) -> Result<String> {
    Ok(serde_json::to_string_pretty(rows)?)
}

/// Rows for every task, in log order.
pub fn task_rows(reports: &[TaskReport], time_format: &str) -> Vec<TaskRow> {
    reports.iter().map(|r| r.task_row(time_format)).collect()
}

pub fn run<W: Write>(writer: &mut W, log: &Path, config: &Config, json: bool) -> Result<()> {
    let reports = load_reports(log, config)?;
    let rows = task_rows(&reports, &config.time_format);

    if json {
        writeln!(writer, "{}", format_tasks_json(&rows)?)?;
    } else {
        write!(writer, "{}", format_tasks(&rows))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use insta::assert_snapshot;
    use ta_core::{DISPLAY_TIME_FORMAT, LineClassifier, build_reports, parse_lines};

    const LINES: [&str; 5] = [
        "\x1b[38;20m2025-05-11 17:06:00,000 - mmu1 - ANALYSE - START_RUN manual task {'task': 'dock', 'params': {}, 'task_id': 42}\x1b[0m",
        "2025-05-11 17:06:05,000 - mmu1 - ANALYSE - START wait for maestro to complete docking (10,20) (file.py:1)",
        "2025-05-11 17:06:09,500 - mmu1 - ANALYSE - END maestro task - docking completed successfully (file.py:2)",
        "2025-05-11 17:06:10,000 - mmu1 - ANALYSE - END_RUN Task dock completed successfully",
        "2025-05-11 17:07:00,000 - mmu1 - ANALYSE - START_RUN manual task {'task': 'undock', 'params': {}, 'task_id': 43}",
    ];

    fn rows() -> Vec<TaskRow> {
        let log = parse_lines(LINES, &LineClassifier::default());
        task_rows(&build_reports(&log), DISPLAY_TIME_FORMAT)
    }

    #[test]
    fn tasks_human_output() {
        let output = format_tasks(&rows());
        assert_snapshot!(output, @r"
TASK ID   NAME              STATUS        START                END                  DURATION
42        dock              success       2025-05-11 17:06:00  2025-05-11 17:06:10     10.00
43        undock            incomplete    2025-05-11 17:07:00

2 tasks, 1 incomplete
");
    }

    #[test]
    fn tasks_empty_output() {
        assert_eq!(format_tasks(&[]), "No tasks found.\n");
    }

    #[test]
    fn tasks_json_uses_column_headers() {
        let json = format_tasks_json(&rows()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value[0]["Task ID"], 42);
        assert_eq!(value[0]["Task Name"], "dock");
        assert_eq!(value[0]["Duration (s)"], "10.00");
        assert_eq!(value[1]["Status"], "incomplete");
        assert_eq!(value[1]["End Time"], "");
    }

    #[test]
    fn run_reads_log_file() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("mmu1.log");
        std::fs::write(&path, LINES.join("\n")).unwrap();

        let mut output = Vec::new();
        run(&mut output, &path, &Config::default(), false).unwrap();

        let output = String::from_utf8(output).unwrap();
        assert!(output.starts_with("TASK ID"));
        assert!(output.contains("2 tasks, 1 incomplete"));
    }

    #[test]
    fn run_fails_on_missing_file() {
        let temp = tempfile::tempdir().unwrap();
        let mut output = Vec::new();

        let err = run(
            &mut output,
            &temp.path().join("missing.log"),
            &Config::default(),
            false,
        )
        .unwrap_err();

        assert!(err.to_string().contains("failed to analyse"));
    }
}
