//! Incremental visible-prefix updates
//!
//! Viewers hold a prefix of the current track's entries built by applying
//! deltas in order, so shrinking the prefix only needs a count: the viewer
//! drops that many lines from the end of its list.

use super::entry::{SubtitleEntry, SubtitleLine};

/// Minimal change between two visible counts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delta {
    /// Visible prefix unchanged
    NoChange,
    /// Entries that became visible, in ascending start order
    Append(Vec<SubtitleLine>),
    /// Number of entries to drop from the tail of the displayed list
    Retract(usize),
}

impl Delta {
    pub fn is_no_change(&self) -> bool {
        matches!(self, Delta::NoChange)
    }
}

/// Compute the delta that moves a viewer from `old_count` to `new_count`
/// visible entries of `entries`
pub fn compute_delta(old_count: usize, new_count: usize, entries: &[SubtitleEntry]) -> Delta {
    if new_count > old_count {
        let end = new_count.min(entries.len());
        let start = old_count.min(end);
        Delta::Append(entries[start..end].iter().map(SubtitleEntry::line).collect())
    } else if new_count < old_count {
        Delta::Retract(old_count - new_count)
    } else {
        Delta::NoChange
    }
}
