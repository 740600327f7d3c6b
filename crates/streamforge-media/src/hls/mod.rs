//! HLS playlist generation.
//!
//! This module generates M3U8 media playlists for HLS streaming.

mod playlist;

pub use playlist::{segment_count, MediaPlaylist, PlaylistType, SegmentEntry};
