//! Pending segment requests.

use super::{SegmentType, StreamError};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use streamforge_common::paths::file_exists;
use tokio::sync::oneshot;

type Outcome = Result<PathBuf, StreamError>;

/// A viewer request for one segment, held by its stream until the segment
/// is available, times out, or the viewer goes away.
#[derive(Debug)]
pub struct WaitingSegment {
    segment_type: SegmentType,
    index: u32,
    /// Path relative to the cache directory, used in messages.
    file: PathBuf,
    path: PathBuf,
    requested_at: Instant,
    sender: Option<oneshot::Sender<Outcome>>,
    done: Arc<AtomicBool>,
}

impl WaitingSegment {
    /// Create a pending request and the handle its requester awaits.
    pub fn new(
        segment_type: SegmentType,
        index: u32,
        file: PathBuf,
        path: PathBuf,
        requested_at: Instant,
    ) -> (Self, SegmentWait) {
        let (sender, receiver) = oneshot::channel();
        let done = Arc::new(AtomicBool::new(false));

        let waiting = Self {
            segment_type,
            index,
            file,
            path,
            requested_at,
            sender: Some(sender),
            done: Arc::clone(&done),
        };
        let wait = SegmentWait {
            receiver,
            done,
            segment_type,
        };

        (waiting, wait)
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn segment_type(&self) -> SegmentType {
        self.segment_type
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    /// Deliver the outcome to the requester and mark the request done.
    /// Later deliveries are ignored.
    pub fn deliver(&mut self, outcome: Result<(), StreamError>) {
        if let Some(sender) = self.sender.take() {
            // A closed receiver means the requester already left
            let _ = sender.send(outcome.map(|()| self.path.clone()));
        }
        self.done.store(true, Ordering::Release);
    }

    /// Resolve the request if its file exists or it waited longer than
    /// `max_wait`. Returns whether the request was resolved.
    pub fn check_available(&mut self, now: Instant, max_wait: Duration) -> bool {
        if file_exists(&self.path) {
            self.deliver(Ok(()));
            true
        } else if self.requested_at + max_wait < now {
            let file = self.file.clone();
            self.deliver(Err(StreamError::Timeout(file)));
            true
        } else {
            false
        }
    }
}

/// Handle a requester awaits for its segment.
///
/// Dropping the handle, for example when the HTTP client disconnects, marks
/// the request done so the monitor discards it.
#[derive(Debug)]
pub struct SegmentWait {
    receiver: oneshot::Receiver<Outcome>,
    done: Arc<AtomicBool>,
    segment_type: SegmentType,
}

impl SegmentWait {
    pub fn segment_type(&self) -> SegmentType {
        self.segment_type
    }

    /// Wait until the segment file is ready and return its path.
    pub async fn wait(mut self) -> Result<PathBuf, StreamError> {
        match (&mut self.receiver).await {
            Ok(outcome) => outcome,
            // The request was dropped without an answer
            Err(_) => Err(StreamError::Cancelled),
        }
    }
}

impl Drop for SegmentWait {
    fn drop(&mut self) {
        self.done.store(true, Ordering::Release);
    }
}
