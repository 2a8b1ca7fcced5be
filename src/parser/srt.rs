//! SubRip (`.srt`) parser
//!
//! ```text
//! 1
//! 00:00:01,000 --> 00:00:03,000
//! First subtitle line
//! Can be multiple lines
//!
//! 2
//! 00:00:04,000 --> 00:00:06,000
//! Second subtitle
//! ```
//!
//! Parsing is lenient per block: a malformed block is logged and skipped,
//! the rest of the file still loads.

use std::sync::OnceLock;

use regex::Regex;

use super::{ParseError, SubtitleParser};
use crate::timeline::SubtitleEntry;

/// Reason one SRT block or timestamp was rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BlockError {
    #[error("invalid timestamp '{0}' (expected HH:MM:SS,mmm)")]
    InvalidTimestamp(String),
    #[error("minutes out of range in '{0}'")]
    MinutesOutOfRange(String),
    #[error("seconds out of range in '{0}'")]
    SecondsOutOfRange(String),
    #[error("only {0} lines (need at least 3)")]
    TooFewLines(usize),
    #[error("invalid sequence number '{0}'")]
    InvalidSequence(String),
    #[error("invalid timing line '{0}'")]
    InvalidTiming(String),
    #[error("start time ({start_ms}ms) not before end time ({end_ms}ms)")]
    NotIncreasing { start_ms: u64, end_ms: u64 },
    #[error("empty subtitle text")]
    EmptyText,
}

fn timing_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([\d:,]+)\s*-->\s*([\d:,]+)").expect("valid timing regex"))
}

fn timestamp_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{2}):(\d{2}):(\d{2}),(\d{3})").expect("valid timestamp regex"))
}

/// Parse an SRT timestamp (`HH:MM:SS,mmm`) into milliseconds
pub fn parse_timestamp(timestamp: &str) -> Result<u64, BlockError> {
    let caps = timestamp_pattern()
        .captures(timestamp)
        .ok_or_else(|| BlockError::InvalidTimestamp(timestamp.to_string()))?;

    // The pattern guarantees ASCII digits of bounded width
    let field = |i: usize| caps[i].parse::<u64>().unwrap_or(0);
    let (hours, minutes, seconds, millis) = (field(1), field(2), field(3), field(4));

    if minutes >= 60 {
        return Err(BlockError::MinutesOutOfRange(timestamp.to_string()));
    }
    if seconds >= 60 {
        return Err(BlockError::SecondsOutOfRange(timestamp.to_string()));
    }

    Ok((hours * 3600 + minutes * 60 + seconds) * 1000 + millis)
}

/// Entries that have started at or before `position_ms`
pub fn filter_entries_up_to(entries: &[SubtitleEntry], position_ms: u64) -> Vec<SubtitleEntry> {
    entries
        .iter()
        .filter(|e| e.start_ms <= position_ms)
        .cloned()
        .collect()
}

/// Default parser collaborator for SubRip text
#[derive(Debug, Default, Clone, Copy)]
pub struct SrtParser;

impl SrtParser {
    pub fn new() -> Self {
        Self
    }

    fn parse_block(block: &str) -> Result<SubtitleEntry, BlockError> {
        let lines: Vec<&str> = block.lines().collect();
        if lines.len() < 3 {
            return Err(BlockError::TooFewLines(lines.len()));
        }

        if lines[0].trim().parse::<u64>().is_err() {
            return Err(BlockError::InvalidSequence(lines[0].to_string()));
        }

        let caps = timing_line()
            .captures(lines[1])
            .ok_or_else(|| BlockError::InvalidTiming(lines[1].to_string()))?;
        let start_ms = parse_timestamp(&caps[1])?;
        let end_ms = parse_timestamp(&caps[2])?;

        if start_ms >= end_ms {
            return Err(BlockError::NotIncreasing { start_ms, end_ms });
        }

        let text = lines[2..].join("\n");
        if text.trim().is_empty() {
            return Err(BlockError::EmptyText);
        }

        Ok(SubtitleEntry::new(start_ms, end_ms, text))
    }
}

impl SubtitleParser for SrtParser {
    fn parse(&self, raw: &str) -> Result<Vec<SubtitleEntry>, ParseError> {
        let content = raw.trim_start_matches('\u{FEFF}').replace("\r\n", "\n");
        let content = content.trim();
        if content.is_empty() {
            return Err(ParseError::Empty);
        }

        let blocks: Vec<&str> = content.split("\n\n").collect();
        let mut entries = Vec::with_capacity(blocks.len());
        let mut skipped = 0usize;

        for (idx, block) in blocks.iter().enumerate() {
            let block = block.trim();
            if block.is_empty() {
                continue;
            }

            match Self::parse_block(block) {
                Ok(entry) => entries.push(entry),
                Err(reason) => {
                    skipped += 1;
                    tracing::warn!(block = idx + 1, reason = %reason, "Skipping SRT block");
                }
            }
        }

        if entries.is_empty() {
            return Err(ParseError::NoValidEntries {
                blocks: blocks.len(),
            });
        }

        tracing::debug!(entries = entries.len(), skipped = skipped, "Parsed SRT content");

        entries.sort_by_key(|e| e.start_ms);
        Ok(entries)
    }
}
