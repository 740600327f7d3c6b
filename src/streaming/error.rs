//! Errors surfaced by the streaming engine.

use axum::http::StatusCode;
use std::path::PathBuf;

/// Errors from manifest and segment requests.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("cannot live transcode because cache dir is unset")]
    CacheDirUnset,

    #[error("stream manager is shutting down")]
    ShuttingDown,

    #[error("invalid hash")]
    InvalidHash,

    #[error("invalid segment")]
    InvalidSegment,

    #[error("invalid resolution: {0}")]
    InvalidResolution(String),

    #[error("unknown stream profile: {0}")]
    UnknownProfile(String),

    #[error("probe failed: {0}")]
    Probe(#[source] streamforge_av::Error),

    #[error("error starting transcode process: {0}")]
    Launch(#[source] streamforge_av::Error),

    #[error("timed out waiting for segment file {} to be generated", .0.display())]
    Timeout(PathBuf),

    /// The request was abandoned because the manager shut down.
    #[error("segment request cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StreamError {
    /// HTTP status this error maps to.
    pub fn status_code(&self) -> StatusCode {
        match self {
            StreamError::CacheDirUnset | StreamError::ShuttingDown | StreamError::Cancelled => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            StreamError::InvalidHash
            | StreamError::InvalidSegment
            | StreamError::InvalidResolution(_)
            | StreamError::UnknownProfile(_) => StatusCode::BAD_REQUEST,
            StreamError::Probe(_)
            | StreamError::Launch(_)
            | StreamError::Timeout(_)
            | StreamError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            StreamError::CacheDirUnset => "cache_dir_unset",
            StreamError::ShuttingDown => "shutting_down",
            StreamError::InvalidHash => "invalid_hash",
            StreamError::InvalidSegment => "invalid_segment",
            StreamError::InvalidResolution(_) => "invalid_resolution",
            StreamError::UnknownProfile(_) => "unknown_profile",
            StreamError::Probe(_) => "probe_error",
            StreamError::Launch(_) => "transcode_error",
            StreamError::Timeout(_) => "segment_timeout",
            StreamError::Cancelled => "cancelled",
            StreamError::Io(_) => "io_error",
        }
    }
}
