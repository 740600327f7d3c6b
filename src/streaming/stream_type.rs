//! Stream profiles and segment container formats.

use super::{StreamError, StreamingResolution};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use streamforge_av::{Args, VideoFilter};
use streamforge_media::MediaPlaylist;

/// Length of every segment in seconds. The last segment of a file may be
/// shorter.
pub const SEGMENT_LENGTH: u32 = 2;

pub const MIME_HLS: &str = "application/vnd.apple.mpegurl";
pub const MIME_MPEG_TS: &str = "video/MP2T";

/// Name of the playlist the encoder writes alongside its segments.
const ENCODER_PLAYLIST: &str = "manifest.m3u8";

/// Container format of individual segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentType {
    MpegTs,
}

impl SegmentType {
    pub fn extension(&self) -> &'static str {
        match self {
            SegmentType::MpegTs => "ts",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            SegmentType::MpegTs => MIME_MPEG_TS,
        }
    }

    /// Filename of a finished segment.
    pub fn filename(&self, index: u32) -> String {
        format!("{}.{}", index, self.extension())
    }

    /// Filename the encoder writes a segment to while it is in progress.
    pub fn hidden_filename(&self, index: u32) -> String {
        format!(".{}", self.filename(index))
    }

    /// Encoder output pattern for hidden segment files.
    fn hidden_pattern(&self) -> String {
        format!(".%d.{}", self.extension())
    }

    /// Parse a segment index from a request path component, either a bare
    /// index or a filename such as `3.ts`.
    pub fn parse_index(&self, s: &str) -> Result<u32, StreamError> {
        let digits = s
            .strip_suffix(self.extension())
            .and_then(|rest| rest.strip_suffix('.'))
            .unwrap_or(s);

        // u32 parsing accepts a leading '+'
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(StreamError::InvalidSegment);
        }
        digits.parse().map_err(|_| StreamError::InvalidSegment)
    }
}

/// An HLS streaming profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamType {
    /// Re-encode to H.264 video and stereo AAC audio.
    Hls,
    /// Copy the source video stream, re-encode audio only.
    HlsCopy,
}

impl StreamType {
    pub fn name(&self) -> &'static str {
        match self {
            StreamType::Hls => "hls",
            StreamType::HlsCopy => "hls-copy",
        }
    }

    pub fn segment_type(&self) -> SegmentType {
        SegmentType::MpegTs
    }

    /// MIME type of the manifest.
    pub fn mime_type(&self) -> &'static str {
        MIME_HLS
    }

    /// Cache directory name for a source hash and resolution cap.
    pub fn file_dir(&self, hash: &str, max_transcode_size: u32) -> String {
        if max_transcode_size == 0 {
            format!("{}_{}", hash, self)
        } else {
            format!("{}_{}_{}", hash, self, max_transcode_size)
        }
    }

    /// Profile-specific encoder arguments for output starting at
    /// `start_index` and written to `output_dir`.
    ///
    /// `drop_audio` encodes video only, for sources whose audio cannot be
    /// carried. `filter` is ignored when the video stream is copied.
    pub fn build_args(
        &self,
        start_index: u32,
        filter: &VideoFilter,
        drop_audio: bool,
        output_dir: &Path,
    ) -> Args {
        let args = match self {
            StreamType::Hls => Args::new()
                .args([
                    "-c:v",
                    "libx264",
                    "-pix_fmt",
                    "yuv420p",
                    "-preset",
                    "veryfast",
                    "-crf",
                    "25",
                    "-flags",
                    "+cgop",
                ])
                .arg("-force_key_frames")
                .arg(format!("expr:gte(t,n_forced*{})", SEGMENT_LENGTH))
                .args(["-sc_threshold", "0"])
                .video_filter(filter),
            StreamType::HlsCopy => Args::new().args(["-c:v", "copy"]),
        };

        let args = if drop_audio {
            args.arg("-an")
        } else {
            args.args(["-c:a", "aac", "-ac", "2"])
        };

        let segment_type = self.segment_type();
        args.args(["-sn", "-copyts", "-avoid_negative_ts", "disabled", "-f", "hls"])
            .arg("-start_number")
            .arg(start_index.to_string())
            .arg("-hls_time")
            .arg(SEGMENT_LENGTH.to_string())
            .args(["-hls_segment_type", "mpegts", "-hls_playlist_type", "vod"])
            .arg("-hls_segment_filename")
            .arg(
                output_dir
                    .join(segment_type.hidden_pattern())
                    .to_string_lossy()
                    .into_owned(),
            )
            .arg(output_dir.join(ENCODER_PLAYLIST).to_string_lossy().into_owned())
    }

    /// Render the manifest for a source of `duration` seconds. Segment URIs
    /// are `<base_url>/<index>.ts`, carrying the resolution as a query
    /// parameter when one was requested.
    pub fn render_manifest(
        &self,
        duration: f64,
        base_url: &str,
        resolution: Option<StreamingResolution>,
    ) -> String {
        let query = resolution
            .map(|r| format!("?resolution={}", r))
            .unwrap_or_default();
        let segment_type = self.segment_type();

        MediaPlaylist::fixed_length(duration, SEGMENT_LENGTH, |index| {
            format!("{}/{}{}", base_url, segment_type.filename(index), query)
        })
        .render()
    }
}

impl fmt::Display for StreamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StreamType {
    type Err = StreamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hls" => Ok(StreamType::Hls),
            "hls-copy" => Ok(StreamType::HlsCopy),
            other => Err(StreamError::UnknownProfile(other.to_string())),
        }
    }
}
