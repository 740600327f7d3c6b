//! Media library.
//!
//! Discovers video files under the configured roots and gives each a stable
//! id for stream URLs and a fingerprint that names its segment cache.
//! Rescanning reports files that changed or disappeared so their encoders
//! can be stopped.

mod probe_cache;

pub use probe_cache::ProbeCache;

use parking_lot::RwLock;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::UNIX_EPOCH;
use streamforge_av::{Prober, VideoFile};
use streamforge_common::paths::{has_extension, video_extensions};
use streamforge_common::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::LibraryConfig;

/// A video file in the library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaEntry {
    /// Stable id derived from the path.
    pub id: String,
    pub path: PathBuf,
    /// Fingerprint of path, size and modification time.
    pub hash: String,
    pub size: u64,
    /// Modification time in seconds since the epoch.
    pub modified: u64,
}

impl MediaEntry {
    /// Read file metadata and build an entry.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let metadata = std::fs::metadata(path)?;
        let modified = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_nanos())
            .unwrap_or(0);

        let path_str = path.to_string_lossy();
        Ok(Self {
            id: compute_hash(&[path_str.as_bytes()]),
            path: path.to_path_buf(),
            hash: compute_hash(&[
                path_str.as_bytes(),
                &metadata.len().to_le_bytes()[..],
                &modified.to_le_bytes()[..],
            ]),
            size: metadata.len(),
            modified: (modified / 1_000_000_000) as u64,
        })
    }
}

/// Outcome of a library scan.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanSummary {
    pub added: usize,
    pub changed: usize,
    pub removed: usize,
    pub total: usize,
    /// Files whose previous version is gone.
    pub stale: Vec<PathBuf>,
}

/// Scanned video files and their probe cache.
pub struct Library {
    roots: Vec<PathBuf>,
    extensions: Vec<String>,
    entries: RwLock<HashMap<String, MediaEntry>>,
    probes: ProbeCache,
    prober: Arc<dyn Prober>,
}

impl Library {
    pub fn new(config: &LibraryConfig, prober: Arc<dyn Prober>) -> Self {
        let extensions = if config.extensions.is_empty() {
            video_extensions().iter().map(|e| e.to_string()).collect()
        } else {
            config
                .extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_string())
                .collect()
        };

        Self {
            roots: config.paths.clone(),
            extensions,
            entries: RwLock::new(HashMap::new()),
            probes: ProbeCache::default(),
            prober,
        }
    }

    pub fn get(&self, id: &str) -> Option<MediaEntry> {
        self.entries.read().get(id).cloned()
    }

    /// All entries sorted by path.
    pub fn list(&self) -> Vec<MediaEntry> {
        let mut entries: Vec<MediaEntry> = self.entries.read().values().cloned().collect();
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        entries
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Probe an entry, using cached results while the file is unchanged.
    pub fn probe(&self, entry: &MediaEntry) -> streamforge_av::Result<VideoFile> {
        self.probes
            .get_or_probe(&entry.path, |path| self.prober.probe(path))
    }

    /// Rescan all roots and replace the entry set.
    ///
    /// Unavailable roots are skipped with a warning. Cached probes of stale
    /// files are dropped.
    pub fn scan(&self) -> ScanSummary {
        let mut found = HashMap::new();

        for root in &self.roots {
            match self.scan_root(root) {
                Ok(entries) => {
                    for entry in entries {
                        found.insert(entry.id.clone(), entry);
                    }
                }
                Err(e) => warn!("{}", e),
            }
        }

        let mut summary = ScanSummary {
            total: found.len(),
            ..ScanSummary::default()
        };

        let mut entries = self.entries.write();
        for (id, entry) in &found {
            match entries.get(id) {
                None => summary.added += 1,
                Some(old) if old.hash != entry.hash => {
                    summary.changed += 1;
                    summary.stale.push(old.path.clone());
                }
                Some(_) => {}
            }
        }
        for (id, old) in entries.iter() {
            if !found.contains_key(id) {
                summary.removed += 1;
                summary.stale.push(old.path.clone());
            }
        }
        *entries = found;
        drop(entries);

        for path in &summary.stale {
            self.probes.remove(path);
        }

        info!(
            added = summary.added,
            changed = summary.changed,
            removed = summary.removed,
            total = summary.total,
            "Library scan complete"
        );
        summary
    }

    fn scan_root(&self, root: &Path) -> Result<Vec<MediaEntry>, Error> {
        if !root.is_dir() {
            return Err(Error::LibraryRoot(root.to_path_buf()));
        }

        debug!("Scanning directory: {:?}", root);
        let mut entries = Vec::new();

        for entry in WalkDir::new(root)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !entry.file_type().is_file() || !has_extension(path, self.extensions.as_slice()) {
                continue;
            }

            match MediaEntry::from_path(path) {
                Ok(media) => entries.push(media),
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable file"),
            }
        }

        Ok(entries)
    }
}

/// First 16 hex characters of the SHA-256 digest over `parts`.
fn compute_hash(parts: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    let digest = hasher.finalize();
    hex::encode(&digest[..8])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProber(AtomicUsize);

    impl Prober for CountingProber {
        fn probe(&self, path: &Path) -> streamforge_av::Result<VideoFile> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(VideoFile {
                path: path.to_path_buf(),
                duration: 10.0,
                width: 1920,
                height: 1080,
                audio_codec: Some("aac".to_string()),
            })
        }
    }

    fn library(roots: Vec<PathBuf>) -> (Library, Arc<CountingProber>) {
        let prober = Arc::new(CountingProber(AtomicUsize::new(0)));
        let config = LibraryConfig {
            paths: roots,
            extensions: Vec::new(),
        };
        (Library::new(&config, prober.clone()), prober)
    }

    #[test]
    fn test_scan_finds_video_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("season 1")).unwrap();
        std::fs::write(dir.path().join("movie.mkv"), b"a").unwrap();
        std::fs::write(dir.path().join("season 1/ep1.MP4"), b"b").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"c").unwrap();

        let (lib, _) = library(vec![dir.path().to_path_buf()]);
        let summary = lib.scan();

        assert_eq!(summary.added, 2);
        assert_eq!(summary.total, 2);
        assert_eq!(lib.len(), 2);

        let entries = lib.list();
        assert!(entries[0].path.ends_with("movie.mkv"));
        assert_eq!(entries[0].id.len(), 16);
        assert_eq!(entries[0].hash.len(), 16);
        assert_ne!(entries[0].id, entries[0].hash);
        assert_eq!(lib.get(&entries[0].id).unwrap(), entries[0]);
    }

    #[test]
    fn test_missing_root_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("movie.mkv"), b"a").unwrap();

        let (lib, _) = library(vec![dir.path().join("missing"), dir.path().to_path_buf()]);
        assert_eq!(lib.scan().total, 1);
    }

    #[test]
    fn test_ids_are_stable() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("movie.mkv");
        std::fs::write(&file, b"a").unwrap();

        let first = MediaEntry::from_path(&file).unwrap();
        let second = MediaEntry::from_path(&file).unwrap();
        assert_eq!(first, second);

        std::fs::write(&file, b"longer contents").unwrap();
        let changed = MediaEntry::from_path(&file).unwrap();
        assert_eq!(changed.id, first.id);
        assert_ne!(changed.hash, first.hash);
    }

    #[test]
    fn test_rescan_reports_stale_files() {
        let dir = tempfile::tempdir().unwrap();
        let kept = dir.path().join("kept.mkv");
        let changed = dir.path().join("changed.mkv");
        let removed = dir.path().join("removed.mkv");
        for f in [&kept, &changed, &removed] {
            std::fs::write(f, b"a").unwrap();
        }

        let (lib, prober) = library(vec![dir.path().to_path_buf()]);
        lib.scan();
        for entry in lib.list() {
            lib.probe(&entry).unwrap();
        }

        std::fs::write(&changed, b"new contents").unwrap();
        std::fs::remove_file(&removed).unwrap();

        let summary = lib.scan();
        assert_eq!(summary.added, 0);
        assert_eq!(summary.changed, 1);
        assert_eq!(summary.removed, 1);
        assert_eq!(summary.total, 2);
        let mut stale = summary.stale.clone();
        stale.sort();
        assert_eq!(stale, vec![changed.clone(), removed.clone()]);

        // Only the changed file is probed again
        for entry in lib.list() {
            lib.probe(&entry).unwrap();
        }
        assert_eq!(prober.0.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_probe_is_cached() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("movie.mkv"), b"a").unwrap();

        let (lib, prober) = library(vec![dir.path().to_path_buf()]);
        lib.scan();
        let entry = lib.list().remove(0);

        assert_eq!(lib.probe(&entry).unwrap().duration, 10.0);
        lib.probe(&entry).unwrap();
        assert_eq!(prober.0.load(Ordering::SeqCst), 1);
    }
}
