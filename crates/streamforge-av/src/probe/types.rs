//! Probe result types.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The subset of media metadata the streaming engine works with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoFile {
    /// Path to the source file.
    pub path: PathBuf,
    /// Duration in seconds.
    pub duration: f64,
    /// Width of the first video stream in pixels.
    pub width: u32,
    /// Height of the first video stream in pixels.
    pub height: u32,
    /// Codec name of the first audio stream, if the file has audio.
    pub audio_codec: Option<String>,
}
