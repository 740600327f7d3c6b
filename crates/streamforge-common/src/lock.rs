//! Path-scoped advisory read locks.
//!
//! A [`ReadLock`] marks a file as being read by a long-running consumer
//! (typically an encoder process). Each lock carries a [`CancellationToken`]
//! that the holder watches; [`ReadLockManager::cancel`] revokes every lock on
//! a path, which is how code that wants to rename or delete a file asks the
//! current readers to stop first.
//!
//! Locks are released when the guard is dropped, so release happens exactly
//! once regardless of how the holder finishes.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct Inner {
    locks: Mutex<HashMap<PathBuf, Vec<LockEntry>>>,
    next_id: AtomicU64,
}

struct LockEntry {
    id: u64,
    token: CancellationToken,
}

/// Registry of advisory read locks keyed by file path.
///
/// Cheap to clone; clones share the same registry.
#[derive(Clone, Default)]
pub struct ReadLockManager {
    inner: Arc<Inner>,
}

impl ReadLockManager {
    /// Create an empty lock manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire a read lock on `path` with its own root cancellation token.
    pub fn read_lock(&self, path: &Path) -> ReadLock {
        self.acquire(path, CancellationToken::new())
    }

    /// Acquire a read lock on `path` whose token is a child of `parent`.
    ///
    /// Cancelling `parent` (for example on service shutdown) revokes the lock.
    pub fn read_lock_with_parent(&self, parent: &CancellationToken, path: &Path) -> ReadLock {
        self.acquire(path, parent.child_token())
    }

    fn acquire(&self, path: &Path, token: CancellationToken) -> ReadLock {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .locks
            .lock()
            .entry(path.to_path_buf())
            .or_default()
            .push(LockEntry {
                id,
                token: token.clone(),
            });

        tracing::trace!(path = %path.display(), lock_id = id, "Acquired read lock");

        ReadLock {
            inner: Arc::clone(&self.inner),
            path: path.to_path_buf(),
            id,
            token,
        }
    }

    /// Revoke every read lock held on `path`.
    ///
    /// Returns the number of locks that were signalled. The locks stay
    /// registered until their holders drop them.
    pub fn cancel(&self, path: &Path) -> usize {
        let locks = self.inner.locks.lock();
        let Some(entries) = locks.get(path) else {
            return 0;
        };

        for entry in entries {
            entry.token.cancel();
        }

        if !entries.is_empty() {
            tracing::info!(
                path = %path.display(),
                count = entries.len(),
                "Cancelled read locks"
            );
        }

        entries.len()
    }

    /// Check whether any read lock is currently held on `path`.
    pub fn is_locked(&self, path: &Path) -> bool {
        self.lock_count(path) > 0
    }

    /// Number of read locks currently held on `path`.
    pub fn lock_count(&self, path: &Path) -> usize {
        self.inner
            .locks
            .lock()
            .get(path)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

/// Guard for a single read lock. Releases the lock on drop.
pub struct ReadLock {
    inner: Arc<Inner>,
    path: PathBuf,
    id: u64,
    token: CancellationToken,
}

impl ReadLock {
    /// Token that fires when the lock is revoked or released.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Path this lock is held on.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Debug for ReadLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadLock")
            .field("path", &self.path)
            .field("id", &self.id)
            .field("cancelled", &self.token.is_cancelled())
            .finish()
    }
}

impl Drop for ReadLock {
    fn drop(&mut self) {
        // Anything still watching the token must stop once the lock is gone.
        self.token.cancel();

        let mut locks = self.inner.locks.lock();
        if let Some(entries) = locks.get_mut(&self.path) {
            entries.retain(|e| e.id != self.id);
            if entries.is_empty() {
                locks.remove(&self.path);
            }
        }

        tracing::trace!(path = %self.path.display(), lock_id = self.id, "Released read lock");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_and_release() {
        let manager = ReadLockManager::new();
        let path = Path::new("/media/a.mkv");

        let first = manager.read_lock(path);
        let second = manager.read_lock(path);
        assert_eq!(manager.lock_count(path), 2);

        drop(first);
        assert_eq!(manager.lock_count(path), 1);

        drop(second);
        assert!(!manager.is_locked(path));
    }

    #[test]
    fn test_cancel_signals_all_holders() {
        let manager = ReadLockManager::new();
        let path = Path::new("/media/a.mkv");
        let other = Path::new("/media/b.mkv");

        let a1 = manager.read_lock(path);
        let a2 = manager.read_lock(path);
        let b = manager.read_lock(other);

        assert_eq!(manager.cancel(path), 2);
        assert!(a1.token().is_cancelled());
        assert!(a2.token().is_cancelled());
        assert!(!b.token().is_cancelled());

        // Cancelled locks stay registered until dropped
        assert_eq!(manager.lock_count(path), 2);
    }

    #[test]
    fn test_cancel_unlocked_path() {
        let manager = ReadLockManager::new();
        assert_eq!(manager.cancel(Path::new("/nothing")), 0);
    }

    #[test]
    fn test_parent_cancellation_revokes_lock() {
        let manager = ReadLockManager::new();
        let parent = CancellationToken::new();
        let lock = manager.read_lock_with_parent(&parent, Path::new("/media/a.mkv"));

        assert!(!lock.token().is_cancelled());
        parent.cancel();
        assert!(lock.token().is_cancelled());
    }

    #[test]
    fn test_drop_cancels_token() {
        let manager = ReadLockManager::new();
        let lock = manager.read_lock(Path::new("/media/a.mkv"));
        let token = lock.token().clone();

        drop(lock);
        assert!(token.is_cancelled());
    }
}
