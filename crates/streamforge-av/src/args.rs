//! Encoder argument lists.
//!
//! [`Args`] is an ordered list of command-line arguments with builder
//! helpers for the options streamforge passes to ffmpeg. Builders consume and
//! return `self` so argument lists read top to bottom:
//!
//! ```
//! use streamforge_av::{Args, LogLevel, VideoFilter};
//!
//! let filter = VideoFilter::default().scale_max(1920, 1080, 720);
//! let args = Args::new()
//!     .arg("-hide_banner")
//!     .log_level(LogLevel::Error)
//!     .seek(4.0)
//!     .input("/media/a.mkv")
//!     .video_filter(&filter);
//!
//! assert_eq!(
//!     args.to_string(),
//!     "-hide_banner -loglevel error -ss 4 -i /media/a.mkv -vf scale=-2:720"
//! );
//! ```

use std::fmt;
use std::path::Path;

/// FFmpeg `-loglevel` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Quiet,
    Error,
    Warning,
    Info,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Quiet => "quiet",
            LogLevel::Error => "error",
            LogLevel::Warning => "warning",
            LogLevel::Info => "info",
        }
    }
}

/// An ordered list of encoder arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Args(Vec<String>);

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a single argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.0.push(arg.into());
        self
    }

    /// Append several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0.extend(args.into_iter().map(Into::into));
        self
    }

    /// Append every argument of `other`.
    pub fn extend(mut self, other: Args) -> Self {
        self.0.extend(other.0);
        self
    }

    pub fn log_level(self, level: LogLevel) -> Self {
        self.args(["-loglevel", level.as_str()])
    }

    /// Seek the next input to `seconds`.
    pub fn seek(self, seconds: f64) -> Self {
        self.args(["-ss".to_string(), seconds.to_string()])
    }

    pub fn input(self, path: impl AsRef<Path>) -> Self {
        self.args([
            "-i".to_string(),
            path.as_ref().to_string_lossy().into_owned(),
        ])
    }

    /// Append `-vf <filter>` unless the filter is empty.
    pub fn video_filter(self, filter: &VideoFilter) -> Self {
        if filter.is_empty() {
            return self;
        }
        self.args(["-vf".to_string(), filter.to_string()])
    }

    /// Value following the first occurrence of `flag`, if any.
    pub fn value_of(&self, flag: &str) -> Option<&str> {
        self.0
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.0.get(i + 1))
            .map(String::as_str)
    }

    pub fn contains(&self, arg: &str) -> bool {
        self.0.iter().any(|a| a == arg)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(" "))
    }
}

impl IntoIterator for Args {
    type Item = String;
    type IntoIter = std::vec::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Args {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A comma-separated ffmpeg video filter chain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VideoFilter(Vec<String>);

impl VideoFilter {
    /// Append a raw filter.
    pub fn append(mut self, filter: impl Into<String>) -> Self {
        self.0.push(filter.into());
        self
    }

    /// Scale to explicit dimensions. `-2` keeps the aspect ratio with an even
    /// result.
    pub fn scale_dimensions(self, width: i32, height: i32) -> Self {
        self.append(format!("scale={}:{}", width, height))
    }

    /// Cap the smaller dimension of a `width`x`height` input at `max_size`.
    ///
    /// Does nothing when `max_size` is 0 or the input already fits.
    ///
    /// ```
    /// use streamforge_av::VideoFilter;
    ///
    /// let landscape = VideoFilter::default().scale_max(1920, 1080, 720);
    /// assert_eq!(landscape.to_string(), "scale=-2:720");
    ///
    /// let portrait = VideoFilter::default().scale_max(1080, 1920, 720);
    /// assert_eq!(portrait.to_string(), "scale=720:-2");
    ///
    /// assert!(VideoFilter::default().scale_max(1280, 720, 1080).is_empty());
    /// ```
    pub fn scale_max(self, width: u32, height: u32, max_size: u32) -> Self {
        let video_size = width.min(height);
        if max_size == 0 || video_size <= max_size {
            return self;
        }

        let max = i32::try_from(max_size).unwrap_or(i32::MAX);
        if width > height {
            self.scale_dimensions(-2, max)
        } else {
            self.scale_dimensions(max, -2)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for VideoFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(","))
    }
}
