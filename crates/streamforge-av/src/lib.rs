//! # streamforge-av
//!
//! Thin wrappers around the external `ffmpeg` and `ffprobe` tools.
//!
//! This crate provides functionality for:
//! - Probing video files for the metadata needed to stream them
//!   (duration, dimensions, audio codec)
//! - Building encoder argument lists, including the scale filter that caps
//!   output resolution
//! - Spawning encoder processes with piped output
//! - Detecting which tools are installed
//!
//! ## Example
//!
//! ```no_run
//! use streamforge_av::{FFProbe, Prober};
//!
//! let prober = FFProbe::new("ffprobe");
//! let video = prober.probe("/path/to/video.mkv".as_ref())?;
//! println!("{}x{} for {:.1}s", video.width, video.height, video.duration);
//! # Ok::<(), streamforge_av::Error>(())
//! ```

pub mod args;
pub mod audio;
pub mod encoder;
mod error;
pub mod probe;
pub mod tools;

// Re-exports
pub use args::{Args, LogLevel, VideoFilter};
pub use audio::{probe_audio_codec, AudioSupport};
pub use encoder::FFMpeg;
pub use error::{Error, Result};
pub use probe::{FFProbe, Prober, VideoFile};
pub use tools::{check_tool, check_tools, get_tool_path, require_tool, ToolInfo};
