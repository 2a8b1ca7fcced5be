//! Timed subtitle entries and tracks

use serde::{Deserialize, Serialize};

/// One timed subtitle unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleEntry {
    /// Time the entry appears, in milliseconds
    pub start_ms: u64,
    /// Time the entry disappears, in milliseconds (always > `start_ms`)
    pub end_ms: u64,
    /// Subtitle text, possibly multi-line
    pub text: String,
}

impl SubtitleEntry {
    pub fn new(start_ms: u64, end_ms: u64, text: impl Into<String>) -> Self {
        Self {
            start_ms,
            end_ms,
            text: text.into(),
        }
    }

    /// Reduce to what a viewer needs to display
    pub fn line(&self) -> SubtitleLine {
        SubtitleLine {
            text: self.text.clone(),
            start_ms: self.start_ms,
        }
    }
}

/// Viewer-facing form of an entry (the end time is not needed for display)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtitleLine {
    pub text: String,
    pub start_ms: u64,
}

/// A named subtitle track (usually one subtitle file)
///
/// Entries are sorted ascending by `start_ms`; ties keep their input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    name: String,
    entries: Vec<SubtitleEntry>,
}

impl Track {
    /// Create a track, stable-sorting the entries by start time
    pub fn new(name: impl Into<String>, mut entries: Vec<SubtitleEntry>) -> Self {
        entries.sort_by_key(|e| e.start_ms);
        Self {
            name: name.into(),
            entries,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entries(&self) -> &[SubtitleEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Viewer lines for the first `count` entries
    pub fn prefix_lines(&self, count: usize) -> Vec<SubtitleLine> {
        let end = count.min(self.entries.len());
        self.entries[..end].iter().map(SubtitleEntry::line).collect()
    }
}
