//! Streamforge-Media: HLS playlist generation
//!
//! # Modules
//!
//! - `hls` - HLS media playlist generation (m3u8)
//!
//! Segments are produced by an external encoder at a fixed length, so the
//! playlist can be computed from the source duration alone, before any
//! segment exists on disk.

pub mod hls;

pub use hls::{segment_count, MediaPlaylist, PlaylistType, SegmentEntry};
