//! Encoder process spawning.

use crate::args::Args;
use crate::{Error, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::{Child, Command};

/// Handle to the `ffmpeg` executable.
///
/// Turns an [`Args`] list into a running child process with piped stdout
/// and stderr. The child is killed if its handle is dropped.
#[derive(Debug, Clone)]
pub struct FFMpeg {
    path: PathBuf,
}

impl FFMpeg {
    /// Create an encoder that runs the executable at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path to the ffmpeg executable.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Build the command for `args` without starting it.
    pub fn command(&self, args: &Args) -> Command {
        let mut cmd = Command::new(&self.path);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    /// Start the encoder with `args`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ToolNotFound`] if the executable does not exist and
    /// [`Error::Io`] for other spawn failures.
    pub fn spawn(&self, args: &Args) -> Result<Child> {
        tracing::trace!(encoder = %self.path.display(), %args, "Spawning encoder");
        self.command(args)
            .spawn()
            .map_err(|e| Error::from_spawn("ffmpeg", e))
    }
}
