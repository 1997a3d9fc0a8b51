//! Summary command for dumping every task with its raw step events.

use std::io::Write;
use std::path::Path;

use anyhow::Result;
use ta_core::Task;

use super::util::{load_log, push_line};
use crate::Config;

fn format_params(task: &Task) -> String {
    let pairs = task.param_pairs();
    if pairs.is_empty() {
        return "(none)".to_string();
    }
    pairs
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Formats one block per task, separated by blank lines.
pub fn format_summary(tasks: &[Task], time_format: &str) -> String {
    let mut output = String::new();

    if tasks.is_empty() {
        push_line(&mut output, "No tasks found.");
        return output;
    }

    for (i, task) in tasks.iter().enumerate() {
        if i > 0 {
            push_line(&mut output, "");
        }
        push_line(&mut output, &format!("Task ID:   {}", task.id));
        push_line(&mut output, &format!("Task Name: {}", task.name));
        push_line(&mut output, &format!("Params:    {}", format_params(task)));
        push_line(
            &mut output,
            &format!("Start:     {}", task.start_time.format(time_format)),
        );
        let end = task
            .end_time
            .map_or_else(|| "N/A".to_string(), |t| t.format(time_format).to_string());
        push_line(&mut output, &format!("End:       {end}"));
        push_line(&mut output, &format!("Status:    {}", task.status));
        let duration = task
            .duration_seconds()
            .map_or_else(|| "N/A".to_string(), |s| format!("{s:.2} seconds"));
        push_line(&mut output, &format!("Duration:  {duration}"));

        push_line(&mut output, "Steps:");
        for step in &task.steps {
            push_line(
                &mut output,
                &format!(
                    "  - [{}] {} at {}",
                    step.phase,
                    step.description,
                    step.time.format(time_format)
                ),
            );
        }
    }

    output
}

pub fn run<W: Write>(writer: &mut W, log: &Path, config: &Config) -> Result<()> {
    let log = load_log(log, config)?;
    write!(writer, "{}", format_summary(log.tasks(), &config.time_format))?;
    Ok(())
}
