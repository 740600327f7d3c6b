//! In-memory probe result cache.
//!
//! Caches probed metadata per file so repeated manifest and segment requests
//! don't spawn ffprobe every time.

use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};
use streamforge_av::VideoFile;

/// Entry in the probe cache.
struct CacheEntry {
    video_file: VideoFile,
    last_accessed: Instant,
    file_modified: Option<SystemTime>,
}

/// Thread-safe cache of probe results keyed by path.
pub struct ProbeCache {
    entries: DashMap<PathBuf, CacheEntry>,
    max_entries: usize,
    ttl: Duration,
}

impl ProbeCache {
    pub fn new(max_entries: usize, ttl_secs: u64) -> Self {
        Self {
            entries: DashMap::new(),
            max_entries,
            ttl: Duration::from_secs(ttl_secs),
        }
    }

    /// Get probe results from cache or compute them.
    ///
    /// Failures are returned as is and not cached.
    pub fn get_or_probe<F, E>(&self, path: &Path, probe: F) -> Result<VideoFile, E>
    where
        F: FnOnce(&Path) -> Result<VideoFile, E>,
    {
        if let Some(mut entry) = self.entries.get_mut(path) {
            if self.is_entry_valid(&entry, path) {
                entry.last_accessed = Instant::now();
                return Ok(entry.video_file.clone());
            }
            // Stale
            drop(entry);
            self.entries.remove(path);
        }

        let video_file = probe(path)?;

        if self.entries.len() >= self.max_entries {
            self.evict_oldest();
        }

        self.entries.insert(
            path.to_owned(),
            CacheEntry {
                video_file: video_file.clone(),
                last_accessed: Instant::now(),
                file_modified: modified(path),
            },
        );
        Ok(video_file)
    }

    pub fn remove(&self, path: &Path) {
        self.entries.remove(path);
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn is_entry_valid(&self, entry: &CacheEntry, path: &Path) -> bool {
        if entry.last_accessed.elapsed() >= self.ttl {
            return false;
        }

        // If we can't check modification time, assume valid
        match (modified(path), entry.file_modified) {
            (Some(now), Some(then)) => now == then,
            _ => true,
        }
    }

    fn evict_oldest(&self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|entry| entry.last_accessed)
            .map(|entry| entry.key().clone());

        if let Some(key) = oldest {
            self.entries.remove(&key);
        }
    }
}

impl Default for ProbeCache {
    fn default() -> Self {
        // 1000 entries, 1 hour TTL
        Self::new(1000, 3600)
    }
}

fn modified(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}
