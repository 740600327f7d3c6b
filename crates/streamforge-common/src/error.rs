//! Common error types used throughout streamforge.
//!
//! Covers the failure cases shared between the library scanner and the
//! streaming engine: missing files, bad input, and I/O failures.

use std::path::PathBuf;

/// Common error type for streamforge.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested media was not found.
    #[error("Media not found: {0}")]
    NotFound(String),

    /// A library root does not exist or is not a directory.
    #[error("Library root unavailable: {}", .0.display())]
    LibraryRoot(PathBuf),

    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input was provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// An internal error occurred.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new NotFound error.
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a new InvalidInput error.
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a new Internal error.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
