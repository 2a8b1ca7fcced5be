//! Subtitle timeline
//!
//! A track is an ordered run of timed entries. Viewers display the *visible
//! prefix* of the current track: every entry whose start time has passed.
//!
//! ```text
//!   entries:   [ 1000 ][ 3000 ][ 5000 ][ 7000 ]
//!   position:              ▲ 3500
//!   visible:   └──── 2 ────┘
//! ```
//!
//! Moving the position only ever grows or shrinks that prefix at its tail,
//! so a position update is reduced to a [`Delta`]: append the newly started
//! entries, or retract a number of entries from the end.

pub mod delta;
pub mod entry;
pub mod index;

pub use delta::{compute_delta, Delta};
pub use entry::{SubtitleEntry, SubtitleLine, Track};
pub use index::visible_count;
