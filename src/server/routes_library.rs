//! Library API routes.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use streamforge_av::VideoFile;

use super::{AppContext, AppError};
use crate::library::{MediaEntry, ScanSummary};
use crate::streaming::StreamError;

/// Library item with its probed metadata.
#[derive(Debug, Serialize)]
pub struct MediaDetails {
    #[serde(flatten)]
    pub entry: MediaEntry,
    pub video: VideoFile,
}

pub fn library_routes() -> Router<AppContext> {
    Router::new()
        .route("/library", get(list_media))
        .route("/library/scan", post(scan_library))
        .route("/library/:media_id", get(get_media))
}

pub async fn list_media(State(ctx): State<AppContext>) -> impl IntoResponse {
    Json(ctx.library.list())
}

pub async fn get_media(
    State(ctx): State<AppContext>,
    Path(media_id): Path<String>,
) -> Result<Json<MediaDetails>, AppError> {
    let entry = ctx
        .library
        .get(&media_id)
        .ok_or_else(|| streamforge_common::Error::not_found(media_id))?;

    let library = ctx.library.clone();
    let probe_entry = entry.clone();
    let video = tokio::task::spawn_blocking(move || library.probe(&probe_entry))
        .await
        .map_err(|e| streamforge_common::Error::internal(e.to_string()))?
        .map_err(StreamError::Probe)?;

    Ok(Json(MediaDetails { entry, video }))
}

/// Rescan library roots. Encoders reading files that changed or vanished
/// are stopped.
pub async fn scan_library(
    State(ctx): State<AppContext>,
) -> Result<Json<ScanSummary>, AppError> {
    let summary = ctx
        .scan_library()
        .await
        .map_err(|e| streamforge_common::Error::internal(e.to_string()))?;

    Ok(Json(summary))
}
