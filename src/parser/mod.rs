//! Subtitle parsing
//!
//! Sessions receive raw subtitle text per track and hand it to a
//! [`SubtitleParser`]. A parser returns entries sorted by start time, each with
//! `start_ms < end_ms` and non-blank text; malformed blocks are dropped by the
//! parser. A whole track fails only when nothing usable is left.

pub mod srt;

pub use srt::{filter_entries_up_to, parse_timestamp, BlockError, SrtParser};

use std::collections::HashMap;

use crate::timeline::{SubtitleEntry, Track};

/// Failure to turn one track's raw text into entries
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("empty subtitle content")]
    Empty,
    #[error("no valid subtitle entries in {blocks} blocks")]
    NoValidEntries { blocks: usize },
}

/// Converts raw subtitle text into timed entries
pub trait SubtitleParser: Send + Sync {
    fn parse(&self, raw: &str) -> Result<Vec<SubtitleEntry>, ParseError>;
}

/// Parse every raw track, skipping the ones that fail
///
/// Input order is preserved for the tracks that parse. A name given more
/// than once yields one track, at the first position, with the last text.
pub fn parse_tracks(parser: &dyn SubtitleParser, raw_tracks: Vec<(String, String)>) -> Vec<Track> {
    let raw_tracks = dedup_by_name(raw_tracks);
    let mut tracks = Vec::with_capacity(raw_tracks.len());

    for (name, raw) in raw_tracks {
        match parser.parse(&raw) {
            Ok(entries) => {
                tracks.push(Track::new(name, entries));
            }
            Err(e) => {
                tracing::error!(track = %name, error = %e, "Failed to parse subtitle track");
            }
        }
    }

    tracks
}

fn dedup_by_name(raw_tracks: Vec<(String, String)>) -> Vec<(String, String)> {
    let mut positions: HashMap<String, usize> = HashMap::with_capacity(raw_tracks.len());
    let mut unique: Vec<(String, String)> = Vec::with_capacity(raw_tracks.len());

    for (name, raw) in raw_tracks {
        match positions.get(&name) {
            Some(&index) => {
                tracing::warn!(track = %name, "Duplicate track name, keeping the last text");
                unique[index].1 = raw;
            }
            None => {
                positions.insert(name.clone(), unique.len());
                unique.push((name, raw));
            }
        }
    }

    unique
}
