//! HLS playlist structures.

use std::fmt;

/// Media playlist for a single rendition.
#[derive(Debug, Clone)]
pub struct MediaPlaylist {
    /// Protocol version.
    pub version: u32,
    /// Target duration in seconds.
    pub target_duration: u32,
    /// Media sequence number.
    pub media_sequence: u32,
    /// Playlist type (VOD or EVENT).
    pub playlist_type: PlaylistType,
    /// Segment entries.
    pub segments: Vec<SegmentEntry>,
    /// Whether this is an ended playlist.
    pub ended: bool,
}

impl MediaPlaylist {
    /// Create a new, empty VOD playlist.
    pub fn vod(target_duration: u32) -> Self {
        Self {
            version: 3,
            target_duration,
            media_sequence: 0,
            playlist_type: PlaylistType::Vod,
            segments: Vec::new(),
            ended: true,
        }
    }

    /// Build a VOD playlist that splits `duration` seconds into segments of
    /// `segment_length` seconds, the last one truncated.
    ///
    /// `uri` maps a segment index to its URI.
    ///
    /// ```
    /// use streamforge_media::MediaPlaylist;
    ///
    /// let playlist = MediaPlaylist::fixed_length(5.0, 2, |i| format!("{i}.ts"));
    /// let durations: Vec<f64> = playlist.segments.iter().map(|s| s.duration).collect();
    /// assert_eq!(durations, vec![2.0, 2.0, 1.0]);
    /// ```
    pub fn fixed_length<F>(duration: f64, segment_length: u32, mut uri: F) -> Self
    where
        F: FnMut(u32) -> String,
    {
        let mut playlist = Self::vod(segment_length);
        let length = f64::from(segment_length);

        for index in 0..segment_count(duration, segment_length) {
            let start = f64::from(index) * length;
            playlist.segments.push(SegmentEntry {
                duration: length.min(duration - start),
                uri: uri(index),
            });
        }

        playlist
    }

    /// Render to M3U8 string.
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for MediaPlaylist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "#EXTM3U")?;
        writeln!(f, "#EXT-X-VERSION:{}", self.version)?;
        writeln!(f, "#EXT-X-MEDIA-SEQUENCE:{}", self.media_sequence)?;
        writeln!(f, "#EXT-X-TARGETDURATION:{}", self.target_duration)?;

        match self.playlist_type {
            PlaylistType::Vod => writeln!(f, "#EXT-X-PLAYLIST-TYPE:VOD")?,
            PlaylistType::Event => writeln!(f, "#EXT-X-PLAYLIST-TYPE:EVENT")?,
            PlaylistType::Live => {}
        }

        for segment in &self.segments {
            writeln!(f, "#EXTINF:{:.6},", segment.duration)?;
            writeln!(f, "{}", segment.uri)?;
        }

        if self.ended {
            writeln!(f, "#EXT-X-ENDLIST")?;
        }

        Ok(())
    }
}

/// Number of `segment_length` second segments needed to cover `duration`.
///
/// ```
/// use streamforge_media::hls::segment_count;
///
/// assert_eq!(segment_count(10.0, 2), 5);
/// assert_eq!(segment_count(10.1, 2), 6);
/// assert_eq!(segment_count(0.0, 2), 0);
/// ```
pub fn segment_count(duration: f64, segment_length: u32) -> u32 {
    if segment_length == 0 || duration.is_nan() || duration <= 0.0 {
        return 0;
    }
    (duration / f64::from(segment_length)).ceil() as u32
}

/// Playlist type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaylistType {
    Vod,
    Event,
    Live,
}

/// A segment entry in the playlist.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentEntry {
    /// Duration in seconds.
    pub duration: f64,
    /// Segment URI.
    pub uri: String,
}
