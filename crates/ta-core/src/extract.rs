//! Timestamp and parameter extraction from matched lines.

use std::sync::LazyLock;

use chrono::{NaiveDateTime, TimeDelta};
use regex::Regex;

/// `YYYY-MM-DD HH:MM:SS,mmm` anywhere in the line; the first occurrence wins.
static TIMESTAMP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}),(\d{3})").unwrap()
});

/// First parenthesised group that contains no nested parentheses.
static PAREN_GROUP_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\(([^()]+)\)").unwrap());

/// Parses the embedded log timestamp.
///
/// Returns `None` when the line carries no timestamp or the fields are out
/// of range (e.g. month 13), in which case the line contributes no event.
pub fn parse_timestamp(line: &str) -> Option<NaiveDateTime> {
    let caps = TIMESTAMP_RE.captures(line)?;
    let base = NaiveDateTime::parse_from_str(&caps[1], "%Y-%m-%d %H:%M:%S").ok()?;
    let millis: i64 = caps[2].parse().ok()?;
    Some(base + TimeDelta::milliseconds(millis))
}

/// Extracts the integers of the first parenthesised group in `text`.
///
/// Items that are not plain non-negative integers are skipped, so `(3,)`
/// yields `[3]` and `(file.py:12)` yields an empty list. Returns `None` when
/// there is no parenthesised group at all.
pub fn extract_numeric_params(text: &str) -> Option<Vec<i64>> {
    let caps = PAREN_GROUP_RE.captures(text)?;
    Some(
        caps[1]
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty() && item.bytes().all(|b| b.is_ascii_digit()))
            .filter_map(|item| item.parse().ok())
            .collect(),
    )
}

/// Renders a parameter list as `[a, b, c]`.
pub fn format_params(params: &[i64]) -> String {
    let items: Vec<String> = params.iter().map(ToString::to_string).collect();
    format!("[{}]", items.join(", "))
}

/// Cuts trailing parenthesised metadata (`" (file.py:12)"`) and trims.
pub fn clean_description(text: &str) -> &str {
    text.split(" (").next().unwrap_or(text).trim()
}
