//! Live HLS streaming.
//!
//! Media files are transcoded on demand into fixed-length MPEG-TS segments
//! while a player requests them. The manifest is synthesized from the probed
//! duration, so a player can seek anywhere before a single segment exists.
//!
//! # Routes
//!
//! - `GET /stream/{media_id}/{profile}/manifest` - HLS media playlist
//! - `GET /stream/{media_id}/{profile}/{index}.ts` - Media segment
//! - `GET /stream/status` - Running streams and their encoders
//!
//! `profile` is `hls` or `hls-copy`. Both playlist and segment routes accept
//! an optional `?resolution=` cap such as `STANDARD_HD`.

mod error;
mod hls;
mod manager;
mod process;
mod resolution;
mod stream_type;
mod waiting;

pub use error::StreamError;
pub use hls::{stream_file, stream_status, StreamQuery};
pub use manager::{ProcessStatus, StreamManager, StreamOptions, StreamStatus};
pub use process::{ProcessState, TranscodeProcess};
pub use resolution::StreamingResolution;
pub use stream_type::{SegmentType, StreamType, MIME_HLS, MIME_MPEG_TS, SEGMENT_LENGTH};
pub use waiting::{SegmentWait, WaitingSegment};

use axum::{routing::get, Router};

use crate::server::AppContext;

/// Create the streaming router.
///
/// Manifests and segments share one route; the handler tells them apart by
/// the final path component.
pub fn router() -> Router<AppContext> {
    Router::new()
        .route("/status", get(stream_status))
        .route("/:media_id/:profile/:file", get(stream_file))
}
