//! Audio codec support for segmented output.

/// Whether a source audio codec can be carried into a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioSupport {
    /// The codec can be transcoded to the stream's audio format.
    Supported,
    /// No audio stream, or one the stream profiles do not handle. The
    /// stream is encoded video-only.
    MissingUnsupported,
}

const SUPPORTED_CODECS: &[&str] = &["aac", "mp3", "opus", "vorbis"];

/// Classify a source audio codec name as reported by ffprobe.
pub fn probe_audio_codec(codec: Option<&str>) -> AudioSupport {
    match codec {
        Some(c) if SUPPORTED_CODECS.iter().any(|s| s.eq_ignore_ascii_case(c)) => {
            AudioSupport::Supported
        }
        _ => AudioSupport::MissingUnsupported,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_codecs() {
        for codec in ["aac", "mp3", "opus", "vorbis", "AAC"] {
            assert_eq!(probe_audio_codec(Some(codec)), AudioSupport::Supported);
        }
    }

    #[test]
    fn test_unsupported_or_missing() {
        assert_eq!(probe_audio_codec(None), AudioSupport::MissingUnsupported);
        assert_eq!(
            probe_audio_codec(Some("dts")),
            AudioSupport::MissingUnsupported
        );
        assert_eq!(
            probe_audio_codec(Some("truehd")),
            AudioSupport::MissingUnsupported
        );
    }
}
