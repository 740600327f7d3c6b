//! Encoder process state and segment promotion.

use super::SegmentType;
use serde::Serialize;
use std::path::{Path, PathBuf};
use streamforge_common::paths::file_exists;
use tokio_util::sync::CancellationToken;

/// Lifecycle of one encoder invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessState {
    Starting,
    Running,
    ExitedOk,
    ExitedError,
    Cancelled,
}

impl ProcessState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProcessState::ExitedOk | ProcessState::ExitedError | ProcessState::Cancelled
        )
    }
}

/// Handle to a running encoder, owned by its stream.
#[derive(Debug)]
pub struct TranscodeProcess {
    pub(crate) id: u64,
    output_dir: PathBuf,
    segment_type: SegmentType,
    start_index: u32,
    /// Highest segment index the encoder has started writing.
    segment: u32,
    state: ProcessState,
    cancel: CancellationToken,
}

impl TranscodeProcess {
    pub fn new(
        id: u64,
        output_dir: PathBuf,
        segment_type: SegmentType,
        start_index: u32,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            id,
            output_dir,
            segment_type,
            start_index,
            segment: start_index,
            state: ProcessState::Starting,
            cancel,
        }
    }

    pub fn start_index(&self) -> u32 {
        self.start_index
    }

    pub fn segment(&self) -> u32 {
        self.segment
    }

    pub fn state(&self) -> ProcessState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: ProcessState) {
        self.state = state;
    }

    /// Ask the encoder to stop. The supervising task records the outcome.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_stopping(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Make finished segments visible.
    ///
    /// The encoder writes segment N to `.N.ts`; once `.N+1.ts` appears, N is
    /// complete and is renamed to `N.ts`. The newest hidden file is only
    /// promoted after a successful exit, and is deleted after a failed or
    /// cancelled one since it is probably truncated.
    pub fn check_segments(&mut self) {
        let mut last_hidden: Option<u32> = None;
        let mut index = self.segment;

        loop {
            if file_exists(&self.hidden_path(index)) {
                if let Some(previous) = last_hidden {
                    self.promote(previous);
                }
                last_hidden = Some(index);
                self.segment = index;
                index += 1;
                continue;
            }

            if let Some(previous) = last_hidden {
                if self.state == ProcessState::ExitedOk {
                    self.promote(previous);
                } else if self.state.is_terminal() {
                    remove_file(&self.hidden_path(previous));
                }
            }
            break;
        }
    }

    fn hidden_path(&self, index: u32) -> PathBuf {
        self.output_dir
            .join(self.segment_type.hidden_filename(index))
    }

    /// Rename a hidden segment to its visible name. A segment that is
    /// already visible is kept and the duplicate discarded.
    fn promote(&self, index: u32) {
        let hidden = self.hidden_path(index);
        let visible = self.output_dir.join(self.segment_type.filename(index));

        if file_exists(&visible) {
            remove_file(&hidden);
        } else if let Err(e) = std::fs::rename(&hidden, &visible) {
            tracing::warn!(
                path = %hidden.display(),
                error = %e,
                "Failed to promote segment"
            );
        } else {
            tracing::trace!(segment = index, dir = %self.output_dir.display(), "Segment ready");
        }
    }
}

fn remove_file(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), error = %e, "Failed to remove segment");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn process(dir: &Path, start: u32) -> TranscodeProcess {
        let mut p = TranscodeProcess::new(
            1,
            dir.to_path_buf(),
            SegmentType::MpegTs,
            start,
            CancellationToken::new(),
        );
        p.set_state(ProcessState::Running);
        p
    }

    fn touch(dir: &Path, name: &str, contents: &str) {
        std::fs::write(dir.join(name), contents).unwrap();
    }

    fn exists(dir: &Path, name: &str) -> bool {
        dir.join(name).exists()
    }

    #[test]
    fn test_promotes_all_but_newest_while_running() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..3 {
            touch(dir.path(), &format!(".{}.ts", i), "x");
        }

        let mut p = process(dir.path(), 0);
        p.check_segments();

        assert!(exists(dir.path(), "0.ts"));
        assert!(exists(dir.path(), "1.ts"));
        assert!(!exists(dir.path(), "2.ts"));
        assert!(exists(dir.path(), ".2.ts"));
        assert_eq!(p.segment(), 2);
    }

    #[test]
    fn test_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), ".0.ts", "x");
        touch(dir.path(), ".1.ts", "x");

        let mut p = process(dir.path(), 0);
        p.check_segments();
        p.check_segments();
        p.check_segments();

        assert!(exists(dir.path(), "0.ts"));
        assert!(exists(dir.path(), ".1.ts"));
        assert_eq!(p.segment(), 1);

        // Progress resumes from the confirmed index
        touch(dir.path(), ".2.ts", "x");
        p.check_segments();
        assert!(exists(dir.path(), "1.ts"));
        assert_eq!(p.segment(), 2);
    }

    #[test]
    fn test_successful_exit_promotes_last() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), ".4.ts", "x");
        touch(dir.path(), ".5.ts", "x");

        let mut p = process(dir.path(), 4);
        p.set_state(ProcessState::ExitedOk);
        p.check_segments();

        assert!(exists(dir.path(), "4.ts"));
        assert!(exists(dir.path(), "5.ts"));
        assert!(!exists(dir.path(), ".5.ts"));
    }

    #[test]
    fn test_failed_exit_deletes_last() {
        for state in [ProcessState::ExitedError, ProcessState::Cancelled] {
            let dir = tempfile::tempdir().unwrap();
            touch(dir.path(), ".0.ts", "x");
            touch(dir.path(), ".1.ts", "partial");

            let mut p = process(dir.path(), 0);
            p.set_state(state);
            p.check_segments();

            assert!(exists(dir.path(), "0.ts"));
            assert!(!exists(dir.path(), "1.ts"));
            assert!(!exists(dir.path(), ".1.ts"));
        }
    }

    #[test]
    fn test_existing_visible_segment_wins() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "0.ts", "first");
        touch(dir.path(), ".0.ts", "second");
        touch(dir.path(), ".1.ts", "x");

        let mut p = process(dir.path(), 0);
        p.check_segments();

        assert_eq!(
            std::fs::read_to_string(dir.path().join("0.ts")).unwrap(),
            "first"
        );
        assert!(!exists(dir.path(), ".0.ts"));
    }

    #[test]
    fn test_starts_at_start_index() {
        let dir = tempfile::tempdir().unwrap();
        // Stale hidden files below the start index are ignored
        touch(dir.path(), ".1.ts", "x");
        touch(dir.path(), ".8.ts", "x");
        touch(dir.path(), ".9.ts", "x");

        let mut p = process(dir.path(), 8);
        p.check_segments();

        assert!(exists(dir.path(), "8.ts"));
        assert!(exists(dir.path(), ".1.ts"));
        assert_eq!(p.segment(), 9);
    }

    #[test]
    fn test_nothing_written_yet() {
        let dir = tempfile::tempdir().unwrap();
        let mut p = process(dir.path(), 3);
        p.set_state(ProcessState::ExitedError);
        p.check_segments();
        assert_eq!(p.segment(), 3);
    }

    #[test]
    fn test_stop_cancels_token() {
        let dir = tempfile::tempdir().unwrap();
        let p = process(dir.path(), 0);
        assert!(!p.is_stopping());
        p.stop();
        assert!(p.is_stopping());
        assert!(ProcessState::Cancelled.is_terminal());
        assert!(!ProcessState::Running.is_terminal());
    }
}
