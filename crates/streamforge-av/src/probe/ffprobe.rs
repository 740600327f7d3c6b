//! FFprobe-based media probing.

use super::types::VideoFile;
use super::Prober;
use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Command;

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<String>,
}

/// [`Prober`] backed by the `ffprobe` executable.
#[derive(Debug, Clone)]
pub struct FFProbe {
    path: PathBuf,
}

impl FFProbe {
    /// Create a prober that runs the executable at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path to the ffprobe executable.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Prober for FFProbe {
    fn probe(&self, path: &Path) -> Result<VideoFile> {
        if !path.exists() {
            return Err(Error::file_not_found(path));
        }

        let output = Command::new(&self.path)
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(path)
            .output()
            .map_err(|e| Error::from_spawn("ffprobe", e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::tool_failed("ffprobe", stderr.trim().to_string()));
        }

        let json_str = String::from_utf8(output.stdout)
            .map_err(|e| Error::parse_error("ffprobe", format!("Invalid UTF-8: {}", e)))?;

        let ff_output: FfprobeOutput = serde_json::from_str(&json_str)?;

        parse_ffprobe_output(path, ff_output)
    }
}

fn parse_ffprobe_output(path: &Path, output: FfprobeOutput) -> Result<VideoFile> {
    let video = output
        .streams
        .iter()
        .find(|s| s.codec_type == "video")
        .ok_or_else(|| Error::parse_error("ffprobe", "no video stream"))?;

    let audio_codec = output
        .streams
        .iter()
        .find(|s| s.codec_type == "audio")
        .and_then(|s| s.codec_name.clone());

    // Some containers only report duration per stream
    let duration = output
        .format
        .duration
        .as_deref()
        .and_then(parse_seconds)
        .or_else(|| video.duration.as_deref().and_then(parse_seconds))
        .ok_or_else(|| Error::parse_error("ffprobe", "missing duration"))?;

    Ok(VideoFile {
        path: path.to_path_buf(),
        duration,
        width: video.width.unwrap_or(0),
        height: video.height.unwrap_or(0),
        audio_codec,
    })
}

fn parse_seconds(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|d| d.is_finite() && *d >= 0.0)
}
