//! Media file probing.
//!
//! The streaming engine only needs a handful of facts about a source file,
//! collected into [`VideoFile`]. Probing goes through the [`Prober`] trait so
//! the engine can be driven by a fixed prober in tests; [`FFProbe`] is the
//! production implementation.

mod ffprobe;
mod types;

pub use ffprobe::FFProbe;
pub use types::VideoFile;

use crate::Result;
use std::path::Path;

/// Something that can extract [`VideoFile`] metadata from a path.
///
/// Probing is blocking; async callers should run it on the blocking pool.
pub trait Prober: Send + Sync {
    /// Probe the file at `path`.
    fn probe(&self, path: &Path) -> Result<VideoFile>;
}

impl<P: Prober + ?Sized> Prober for std::sync::Arc<P> {
    fn probe(&self, path: &Path) -> Result<VideoFile> {
        (**self).probe(path)
    }
}
