//! Error-to-HTTP response conversion.
//!
//! Route handlers return `Result<T, AppError>`; both the streaming engine's
//! [`StreamError`] and the shared [`streamforge_common::Error`] convert into
//! it with `?`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::streaming::StreamError;

/// Error returned from API handlers.
#[derive(Debug)]
pub enum AppError {
    Stream(StreamError),
    Common(streamforge_common::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Stream(e) => e.status_code(),
            AppError::Common(e) => match e {
                streamforge_common::Error::NotFound(_) => StatusCode::NOT_FOUND,
                streamforge_common::Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
                streamforge_common::Error::LibraryRoot(_)
                | streamforge_common::Error::Io(_)
                | streamforge_common::Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Stream(e) => e.code(),
            AppError::Common(e) => match e {
                streamforge_common::Error::NotFound(_) => "not_found",
                streamforge_common::Error::InvalidInput(_) => "validation_error",
                streamforge_common::Error::LibraryRoot(_) => "library_error",
                streamforge_common::Error::Io(_) => "io_error",
                streamforge_common::Error::Internal(_) => "internal_error",
            },
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::Stream(e) => e.fmt(f),
            AppError::Common(e) => e.fmt(f),
        }
    }
}

impl From<StreamError> for AppError {
    fn from(e: StreamError) -> Self {
        AppError::Stream(e)
    }
}

impl From<streamforge_common::Error> for AppError {
    fn from(e: streamforge_common::Error) -> Self {
        AppError::Common(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() && status != StatusCode::SERVICE_UNAVAILABLE {
            tracing::error!(
                status = %status,
                error = %self,
                "Server error in API handler"
            );
        }

        let body = json!({
            "error": self.to_string(),
            "code": self.code(),
        });

        (status, axum::Json(body)).into_response()
    }
}
