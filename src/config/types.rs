use crate::streaming::StreamingResolution;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub streaming: StreamingConfig,

    #[serde(default)]
    pub library: LibraryConfig,

    #[serde(default)]
    pub tools: ToolsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Live transcoding settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StreamingConfig {
    /// Directory transcoded segments are written to. Live transcoding is
    /// unavailable while unset.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    /// Default resolution cap when a request does not ask for one
    #[serde(default)]
    pub max_transcode_size: StreamingResolution,

    #[serde(default = "default_monitor_interval")]
    pub monitor_interval_ms: u64,

    /// How long a segment request waits for its file before timing out
    #[serde(default = "default_max_segment_wait")]
    pub max_segment_wait_secs: u64,

    /// Segments a request may run ahead of the encoder before it counts as a seek
    #[serde(default = "default_max_segment_gap")]
    pub max_segment_gap: u32,

    /// Segments to encode ahead of the last requested one
    #[serde(default = "default_max_segment_buffer")]
    pub max_segment_buffer: u32,

    /// Idle time before a stream's encoder is stopped and its files removed
    #[serde(default = "default_max_idle")]
    pub max_idle_secs: u64,
}

fn default_monitor_interval() -> u64 {
    200
}
fn default_max_segment_wait() -> u64 {
    15
}
fn default_max_segment_gap() -> u32 {
    5
}
fn default_max_segment_buffer() -> u32 {
    15
}
fn default_max_idle() -> u64 {
    30
}

impl StreamingConfig {
    pub fn monitor_interval(&self) -> Duration {
        Duration::from_millis(self.monitor_interval_ms)
    }

    pub fn max_segment_wait(&self) -> Duration {
        Duration::from_secs(self.max_segment_wait_secs)
    }

    pub fn max_idle_time(&self) -> Duration {
        Duration::from_secs(self.max_idle_secs)
    }
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            max_transcode_size: StreamingResolution::default(),
            monitor_interval_ms: default_monitor_interval(),
            max_segment_wait_secs: default_max_segment_wait(),
            max_segment_gap: default_max_segment_gap(),
            max_segment_buffer: default_max_segment_buffer(),
            max_idle_secs: default_max_idle(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LibraryConfig {
    #[serde(default)]
    pub paths: Vec<PathBuf>,

    /// File extensions to include (empty = known video extensions)
    #[serde(default)]
    pub extensions: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    #[serde(default)]
    pub ffprobe_path: Option<PathBuf>,
}
