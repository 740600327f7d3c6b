//! HLS streaming handlers.
//!
//! The manifest is rendered on request. Segment requests block until the
//! monitor has the segment on disk, then stream the file from the cache.

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use tokio_util::io::ReaderStream;

use super::{StreamError, StreamOptions, StreamType, StreamingResolution};
use crate::server::{AppContext, AppError};

/// Manifest name in request paths.
const MANIFEST: &str = "manifest";

#[derive(Debug, Default, Deserialize)]
pub struct StreamQuery {
    pub resolution: Option<String>,
}

impl StreamQuery {
    fn resolution(&self) -> Result<Option<StreamingResolution>, StreamError> {
        self.resolution
            .as_deref()
            .filter(|r| !r.is_empty())
            .map(str::parse)
            .transpose()
    }
}

/// Serve a manifest or a segment of a library item.
pub async fn stream_file(
    State(ctx): State<AppContext>,
    Path((media_id, profile, file)): Path<(String, String, String)>,
    Query(query): Query<StreamQuery>,
) -> Result<Response, AppError> {
    let stream_type: StreamType = profile.parse()?;
    let resolution = query.resolution()?;

    let entry = ctx
        .library
        .get(&media_id)
        .ok_or_else(|| streamforge_common::Error::not_found(media_id.clone()))?;

    let library = ctx.library.clone();
    let probe_entry = entry.clone();
    let video_file = tokio::task::spawn_blocking(move || library.probe(&probe_entry))
        .await
        .map_err(|e| StreamError::Probe(std::io::Error::other(e).into()))?
        .map_err(StreamError::Probe)?;

    if file == MANIFEST {
        // Query string is not part of the base URL
        let base_url = format!("/api/stream/{}/{}", media_id, stream_type);
        let manifest = ctx
            .streams
            .serve_manifest(stream_type, &video_file, &base_url, resolution)
            .await?;

        return Ok((
            [
                (header::CONTENT_TYPE, stream_type.mime_type()),
                (header::CACHE_CONTROL, "no-cache"),
            ],
            manifest,
        )
            .into_response());
    }

    let wait = ctx.streams.serve_segment(StreamOptions {
        stream_type,
        video_file,
        resolution,
        hash: entry.hash.clone(),
        segment: file,
    })?;

    let segment_type = wait.segment_type();
    let path = match wait.wait().await {
        Ok(path) => path,
        // Shutdown; the connection is going away anyway
        Err(StreamError::Cancelled) => return Ok(StatusCode::SERVICE_UNAVAILABLE.into_response()),
        Err(e) => return Err(e.into()),
    };

    let file = tokio::fs::File::open(&path)
        .await
        .map_err(StreamError::Io)?;
    let len = file.metadata().await.map_err(StreamError::Io)?.len();

    Ok((
        [
            (header::CONTENT_TYPE, segment_type.mime_type().to_string()),
            (header::CONTENT_LENGTH, len.to_string()),
            (header::CACHE_CONTROL, "no-cache".to_string()),
        ],
        Body::from_stream(ReaderStream::new(file)),
    )
        .into_response())
}

/// List running streams.
pub async fn stream_status(State(ctx): State<AppContext>) -> impl IntoResponse {
    Json(ctx.streams.status())
}
