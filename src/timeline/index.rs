//! Position → visible-count lookup

use super::entry::SubtitleEntry;

/// Number of entries whose start time is at or before `position_ms`
///
/// `entries` must be sorted by `start_ms`. This is the rightmost insertion
/// point of `position_ms`, so an entry starting exactly at the position is
/// visible. Runs in O(log n).
pub fn visible_count(entries: &[SubtitleEntry], position_ms: u64) -> usize {
    entries.partition_point(|e| e.start_ms <= position_ms)
}
