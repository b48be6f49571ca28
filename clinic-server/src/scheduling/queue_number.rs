//! Queue number formatting and wait estimation

use shared::util::{format_sequence, parse_sequence_suffix};

pub const QUEUE_PREFIX: &str = "Q";
const QUEUE_WIDTH: usize = 4;

pub fn format_queue_number(value: i64) -> String {
    format_sequence(QUEUE_PREFIX, value, QUEUE_WIDTH)
}

/// Successor of the previous number (`Q-0041` -> `Q-0042`).
///
/// Absent or unparsable input starts over at `Q-0001`. Numbers past 9999
/// simply grow wider.
pub fn next_queue_number(previous: Option<&str>) -> String {
    let last = previous.and_then(parse_sequence_suffix).unwrap_or(0);
    format_queue_number(last + 1)
}

/// Minutes until a 1-based `position` is reached
pub fn estimate_wait_minutes(position: i64, slot_minutes: i64) -> i64 {
    (position - 1).max(0) * slot_minutes
}
