//! Streamforge-Common: shared errors, path helpers, and advisory locks.
//!
//! This crate provides functionality used across streamforge:
//!
//! - **Error Handling**: Common error types and result aliases
//! - **Path Utilities**: Video extension checks and file existence helpers
//! - **Read Locks**: A path-scoped advisory lock manager whose locks can be
//!   revoked, used to stop encoders that are reading a file which is about
//!   to change
//!
//! # Examples
//!
//! ```
//! use streamforge_common::lock::ReadLockManager;
//! use streamforge_common::paths::is_video_file;
//! use std::path::Path;
//!
//! assert!(is_video_file(Path::new("movie.mkv")));
//!
//! let locks = ReadLockManager::new();
//! let guard = locks.read_lock(Path::new("/media/movie.mkv"));
//! assert!(locks.is_locked(Path::new("/media/movie.mkv")));
//! drop(guard);
//! assert!(!locks.is_locked(Path::new("/media/movie.mkv")));
//! ```

pub mod error;
pub mod lock;
pub mod paths;

pub use error::{Error, Result};
pub use lock::{ReadLock, ReadLockManager};
