//! Step description normalization.
//!
//! Start and end messages for the same step are phrased differently by each
//! worker. [`normalize_step`] reduces both to a comparison key so the pairer
//! can match them. Rules are tried in order and the first applicable one wins.

/// Maestro step start: `wait for maestro to complete <name> [params]`.
const MAESTRO_WAIT: &str = "wait for maestro to complete";
/// Mtc step start: `wait for mtc ... task <name> ...`.
const MTC_WAIT: &str = "wait for mtc";
/// Maestro step end: `maestro task - <name> completed successfully`.
const MAESTRO_TASK: &str = "maestro task - ";
const COMPLETED_SUCCESSFULLY: &str = "completed successfully";
/// Maestro step failure: `ERROR: maestro failed to completed task <name> with error ...`.
const MAESTRO_FAILED: &str = "ERROR: maestro failed to completed task";

/// Returns the text between the first and second occurrence of `sep`.
fn second_segment<'a>(text: &'a str, sep: &str) -> Option<&'a str> {
    text.split(sep).nth(1)
}

/// Maps a step description to its canonical comparison key.
///
/// Deterministic and allocation-light; called repeatedly during pairing.
/// Descriptions that match no rule normalize to themselves, trimmed.
pub fn normalize_step(desc: &str) -> String {
    if desc.contains(MAESTRO_WAIT) {
        let head = desc.split('[').next().unwrap_or(desc);
        return head.replace(MAESTRO_WAIT, "").trim().to_string();
    }

    if desc.contains(MTC_WAIT) {
        if let Some(segment) = second_segment(desc, "task") {
            return segment.replace("start the task", "").trim().to_string();
        }
        return desc.trim().to_string();
    }

    if desc.contains(MAESTRO_TASK) && desc.contains(COMPLETED_SUCCESSFULLY) {
        return desc
            .replace(MAESTRO_TASK, "")
            .replace(COMPLETED_SUCCESSFULLY, "")
            .trim()
            .to_string();
    }

    if desc.contains("mtc") && desc.contains("retry") {
        if let Some(segment) = second_segment(desc, "task") {
            let head = segment.split("completed").next().unwrap_or(segment);
            return head.replace("task", "").trim().to_string();
        }
        return desc.trim().to_string();
    }

    if desc.contains(MAESTRO_FAILED) {
        let head = desc.split("with").next().unwrap_or(desc);
        // Maestro reports multi-word task names with spaces but starts them with underscores.
        return head.replace(MAESTRO_FAILED, "").trim().replace(' ', "_");
    }

    if let Some((head, _)) = desc.split_once("SUCCESS") {
        return head.trim().to_string();
    }

    desc.trim().to_string()
}

/// Whether an end key closes a start key: the end key must occur within the start key.
///
/// An empty end key occurs within every start key.
pub fn keys_match(start_key: &str, end_key: &str) -> bool {
    start_key.contains(end_key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maestro_start_drops_boilerplate_and_params() {
        assert_eq!(
            normalize_step("wait for maestro to complete docking [10, 20]"),
            "docking"
        );
    }

    #[test]
    fn maestro_success_end_drops_boilerplate() {
        assert_eq!(
            normalize_step("maestro task - docking completed successfully"),
            "docking"
        );
    }

    #[test]
    fn maestro_failure_joins_words() {
        assert_eq!(
            normalize_step(
                "ERROR: maestro failed to completed task move tray with error collision"
            ),
            "move_tray"
        );
    }

    #[test]
    fn mtc_start_keeps_task_segment() {
        assert_eq!(
            normalize_step("wait for mtc to start the task pick cup"),
            "pick cup"
        );
        assert_eq!(normalize_step("wait for mtc task pick cup"), "pick cup");
    }

    #[test]
    fn mtc_retry_end_keeps_task_segment() {
        assert_eq!(
            normalize_step("mtc retry task pick cup completed after 2 attempts"),
            "pick cup"
        );
    }

    #[test]
    fn success_suffix_is_cut() {
        assert_eq!(
            normalize_step("ERROR HANDLING gripper error SUCCESS"),
            "ERROR HANDLING gripper error"
        );
    }

    #[test]
    fn unmatched_descriptions_are_trimmed() {
        assert_eq!(normalize_step("  move arm home "), "move arm home");
    }

    #[test]
    fn missing_split_points_fall_back_to_input() {
        assert_eq!(normalize_step("wait for mtc pick"), "wait for mtc pick");
        assert_eq!(normalize_step("mtc retry pick"), "mtc retry pick");
    }

    #[test]
    fn normalization_is_idempotent_on_keys() {
        for desc in [
            "wait for maestro to complete docking [10, 20]",
            "maestro task - docking completed successfully",
            "ERROR HANDLING gripper error SUCCESS",
        ] {
            let key = normalize_step(desc);
            assert_eq!(normalize_step(&key), key);
        }
    }

    #[test]
    fn end_key_must_be_within_start_key() {
        assert!(keys_match("docking", "docking"));
        assert!(keys_match("pick cup left", "pick cup"));
        assert!(!keys_match("pick cup", "pick cup left"));
        assert!(keys_match("docking", ""));
    }

    #[test]
    fn bare_maestro_success_end_has_empty_key() {
        assert_eq!(normalize_step("maestro task - completed successfully"), "");
        assert_eq!(normalize_step("wait for mtc task"), "");
    }
}
