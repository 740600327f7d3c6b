//! On-demand segment transcoding.
//!
//! The [`StreamManager`] owns one [`RunningStream`] per (source, profile,
//! resolution cap), keyed by its cache directory name. Segment requests only
//! register a [`WaitingSegment`] and await it. A monitor task runs every
//! `monitor_interval` and does the rest under the manager lock:
//!
//! 1. promotes finished segments of the active encoder,
//! 2. resolves requests whose file exists or that timed out,
//! 3. starts an encoder at the first unresolved request, or stops the
//!    current one when the request is behind it or too far ahead (a seek),
//! 4. otherwise stops the encoder once the look-ahead buffer is full, or
//!    evicts the stream and its files after it has been idle.
//!
//! Encoders run under an advisory read lock on their source file, so other
//! subsystems can terminate them through the [`ReadLockManager`].

use super::process::{ProcessState, TranscodeProcess};
use super::stream_type::{StreamType, SEGMENT_LENGTH};
use super::waiting::{SegmentWait, WaitingSegment};
use super::{StreamError, StreamingResolution};
use crate::config::StreamingConfig;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use streamforge_av::{
    probe_audio_codec, Args, AudioSupport, FFMpeg, LogLevel, Prober, VideoFile, VideoFilter,
};
use streamforge_common::paths::file_exists;
use streamforge_common::{ReadLock, ReadLockManager};
use streamforge_media::segment_count;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Child;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

type StreamMap = HashMap<String, RunningStream>;

/// Parameters of a segment request.
#[derive(Debug, Clone)]
pub struct StreamOptions {
    pub stream_type: StreamType,
    pub video_file: VideoFile,
    /// Requested resolution cap; the configured default applies when unset.
    pub resolution: Option<StreamingResolution>,
    /// Fingerprint of the source, used to name the cache directory.
    pub hash: String,
    /// Segment path component, e.g. `3.ts`.
    pub segment: String,
}

/// State of one stream: its pending requests and its encoder.
#[derive(Debug)]
struct RunningStream {
    dir: String,
    stream_type: StreamType,
    video_file: VideoFile,
    max_transcode_size: u32,
    output_dir: PathBuf,

    waiting: Vec<WaitingSegment>,
    process: Option<TranscodeProcess>,
    last_accessed: Instant,
    last_segment: u32,
}

impl RunningStream {
    /// Full encoder argument list for output starting at `index`.
    fn make_stream_args(&self, index: u32) -> Args {
        let mut args = Args::new().arg("-hide_banner").log_level(LogLevel::Error);

        if index > 0 {
            args = args.seek(f64::from(index) * f64::from(SEGMENT_LENGTH));
        }

        args = args.input(&self.video_file.path);

        let drop_audio = probe_audio_codec(self.video_file.audio_codec.as_deref())
            == AudioSupport::MissingUnsupported;

        let filter = VideoFilter::default().scale_max(
            self.video_file.width,
            self.video_file.height,
            self.max_transcode_size,
        );

        args.extend(
            self.stream_type
                .build_args(index, &filter, drop_audio, &self.output_dir),
        )
    }

    /// Whether every segment of the look-ahead window exists, finished or
    /// still hidden.
    fn buffer_full(&self, buffer: u32) -> bool {
        let segment_type = self.stream_type.segment_type();
        (self.last_segment..self.last_segment.saturating_add(buffer)).all(|i| {
            file_exists(&self.output_dir.join(segment_type.filename(i)))
                || file_exists(&self.output_dir.join(segment_type.hidden_filename(i)))
        })
    }
}

/// Snapshot of a running stream for the status endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct StreamStatus {
    pub dir: String,
    pub profile: String,
    pub last_segment: u32,
    pub waiting: usize,
    pub idle_secs: u64,
    pub process: Option<ProcessStatus>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessStatus {
    pub start_index: u32,
    pub segment: u32,
    pub state: ProcessState,
    pub stopping: bool,
}

struct Inner {
    config: StreamingConfig,
    encoder: FFMpeg,
    prober: Arc<dyn Prober>,
    locks: ReadLockManager,
    shutdown: CancellationToken,
    /// `None` once the manager has shut down.
    streams: Mutex<Option<StreamMap>>,
    next_process_id: AtomicU64,
}

/// Serves live-transcoded HLS manifests and segments.
///
/// Cheap to clone; clones share the same streams.
#[derive(Clone)]
pub struct StreamManager {
    inner: Arc<Inner>,
}

impl StreamManager {
    pub fn new(
        config: StreamingConfig,
        encoder: FFMpeg,
        prober: Arc<dyn Prober>,
        locks: ReadLockManager,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                encoder,
                prober,
                locks,
                shutdown: CancellationToken::new(),
                streams: Mutex::new(Some(HashMap::new())),
                next_process_id: AtomicU64::new(1),
            }),
        }
    }

    pub fn config(&self) -> &StreamingConfig {
        &self.inner.config
    }

    fn cache_dir(&self) -> Result<&Path, StreamError> {
        self.inner
            .config
            .cache_dir
            .as_deref()
            .ok_or(StreamError::CacheDirUnset)
    }

    /// Start the periodic monitor. It stops when the manager shuts down.
    pub fn spawn_monitor(&self) -> JoinHandle<()> {
        let manager = self.clone();
        let token = self.inner.shutdown.clone();
        let period = self.inner.config.monitor_interval();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => manager.monitor_streams(),
                }
            }

            tracing::debug!("Stream monitor stopped");
        })
    }

    /// Render the HLS manifest for a source file.
    ///
    /// The source is probed again for its exact duration. No stream state is
    /// created until a segment is requested.
    pub async fn serve_manifest(
        &self,
        stream_type: StreamType,
        video_file: &VideoFile,
        base_url: &str,
        resolution: Option<StreamingResolution>,
    ) -> Result<String, StreamError> {
        if self.inner.config.cache_dir.is_none() {
            tracing::error!("Cannot live transcode with HLS because cache dir is unset");
            return Err(StreamError::CacheDirUnset);
        }

        let prober = Arc::clone(&self.inner.prober);
        let path = video_file.path.clone();
        let probed = tokio::task::spawn_blocking(move || prober.probe(&path))
            .await
            .map_err(|e| StreamError::Probe(std::io::Error::other(e).into()))?
            .map_err(|e| {
                tracing::warn!(path = %video_file.path.display(), error = %e, "Error generating HLS manifest");
                StreamError::Probe(e)
            })?;

        Ok(stream_type.render_manifest(probed.duration, base_url, resolution))
    }

    /// Register a request for one segment and return the handle to await.
    pub fn serve_segment(&self, options: StreamOptions) -> Result<SegmentWait, StreamError> {
        let cache_dir = self.cache_dir().inspect_err(|_| {
            tracing::error!("Cannot live transcode files because cache dir is unset");
        })?;

        if options.hash.is_empty() {
            return Err(StreamError::InvalidHash);
        }

        let stream_type = options.stream_type;
        let segment_type = stream_type.segment_type();

        // Reject segments past the end of the video
        let index = segment_type.parse_index(&options.segment)?;
        if index >= segment_count(options.video_file.duration, SEGMENT_LENGTH) {
            return Err(StreamError::InvalidSegment);
        }

        let max_transcode_size = options
            .resolution
            .unwrap_or(self.inner.config.max_transcode_size)
            .max_resolution();

        let dir = stream_type.file_dir(&options.hash, max_transcode_size);
        let output_dir = cache_dir.join(&dir);
        let file = Path::new(&dir).join(segment_type.filename(index));
        let path = cache_dir.join(&file);

        let now = Instant::now();
        let (waiting, wait) = WaitingSegment::new(segment_type, index, file, path, now);

        let mut guard = self.inner.streams.lock();
        let streams = guard.as_mut().ok_or(StreamError::ShuttingDown)?;

        let stream = streams
            .entry(dir.clone())
            .or_insert_with(|| RunningStream {
                dir,
                stream_type,
                video_file: options.video_file,
                max_transcode_size,
                output_dir,
                waiting: Vec::with_capacity(10),
                process: None,
                last_accessed: now,
                last_segment: index,
            });

        stream.last_accessed = now;
        stream.last_segment = index;
        stream.waiting.push(waiting);

        Ok(wait)
    }

    /// Run one monitor pass now.
    pub fn monitor_streams(&self) {
        self.monitor_streams_at(Instant::now());
    }

    /// Run one monitor pass as if the current time were `now`.
    pub fn monitor_streams_at(&self, now: Instant) {
        let mut guard = self.inner.streams.lock();
        let Some(streams) = guard.as_mut() else {
            return;
        };

        let dirs: Vec<String> = streams.keys().cloned().collect();
        for dir in dirs {
            let Some(stream) = streams.get_mut(&dir) else {
                continue;
            };

            if self.monitor_stream(stream, now) {
                streams.remove(&dir);
            }
        }
    }

    /// Drive one stream. Returns true when the stream should be evicted.
    fn monitor_stream(&self, stream: &mut RunningStream, now: Instant) -> bool {
        if let Some(process) = stream.process.as_mut() {
            process.check_segments();
        }

        let max_wait = self.inner.config.max_segment_wait();
        let mut transcode_started = false;

        let mut waiting = std::mem::take(&mut stream.waiting);
        waiting.retain_mut(|segment| {
            if segment.is_done() || segment.check_available(now, max_wait) {
                return false;
            }
            if !transcode_started {
                transcode_started = self.ensure_transcode(stream, segment);
            }
            !segment.is_done()
        });
        stream.waiting = waiting;

        !transcode_started && self.check_transcode(stream, now)
    }

    /// Make sure an encoder will produce `segment`. Returns true if an
    /// encoder was started or a stop was requested.
    fn ensure_transcode(&self, stream: &mut RunningStream, segment: &mut WaitingSegment) -> bool {
        let index = segment.index();

        if stream.process.is_none() {
            if let Err(e) = self.start_transcode(stream, index) {
                tracing::error!(dir = %stream.dir, segment = index, error = %e, "Failed to start transcode");
                segment.deliver(Err(e));
            }
            return true;
        }

        let Some(process) = &stream.process else {
            return false;
        };

        let current = process.segment();
        if index >= current && index <= current.saturating_add(self.inner.config.max_segment_gap) {
            return false;
        }

        // Only stop here. The replacement starts once the old process has
        // exited and cleared itself from the stream.
        if !process.is_stopping() {
            tracing::debug!(
                dir = %stream.dir,
                segment = index,
                encoder_segment = current,
                "Seek detected, restarting transcode"
            );
        }
        process.stop();
        true
    }

    /// Evict the stream when idle, or stop its encoder when the buffer is
    /// full. Returns true when the stream should be evicted.
    ///
    /// An idle stream whose encoder is still exiting stays in the map, so a
    /// new request for the same directory waits for that exit instead of
    /// starting a second encoder next to it.
    fn check_transcode(&self, stream: &mut RunningStream, now: Instant) -> bool {
        let config = &self.inner.config;

        if stream.waiting.is_empty() && stream.last_accessed + config.max_idle_time() < now {
            if let Some(process) = &stream.process {
                if !process.is_stopping() {
                    tracing::debug!(dir = %stream.dir, "Stream not accessed recently, cancelling transcode");
                }
                process.stop();
                return false;
            }

            tracing::debug!(dir = %stream.dir, "Removing files of idle stream");
            remove_transcode_files(stream);
            return true;
        }

        if let Some(process) = &stream.process {
            if !process.is_stopping() && stream.buffer_full(config.max_segment_buffer) {
                tracing::debug!(dir = %stream.dir, "Stopping transcode, buffer is full");
                process.stop();
            }
        }

        false
    }

    /// Spawn an encoder for `stream` starting at segment `index`.
    fn start_transcode(&self, stream: &mut RunningStream, index: u32) -> Result<(), StreamError> {
        tracing::debug!(dir = %stream.dir, segment = index, "Starting transcode");

        std::fs::create_dir_all(&stream.output_dir)?;

        let lock = self
            .inner
            .locks
            .read_lock_with_parent(&self.inner.shutdown, &stream.video_file.path);

        let args = stream.make_stream_args(index);
        tracing::trace!(dir = %stream.dir, %args, "Running encoder");

        let id = self.inner.next_process_id.fetch_add(1, Ordering::Relaxed);
        let mut process = TranscodeProcess::new(
            id,
            stream.output_dir.clone(),
            stream.stream_type.segment_type(),
            index,
            lock.token().clone(),
        );

        // Dropping the lock on failure releases it
        let child = self
            .inner
            .encoder
            .spawn(&args)
            .map_err(StreamError::Launch)?;

        process.set_state(ProcessState::Running);
        stream.process = Some(process);

        tokio::spawn(supervise(
            Arc::clone(&self.inner),
            stream.dir.clone(),
            id,
            child,
            lock,
            args,
        ));

        Ok(())
    }

    /// Stop every encoder reading `path`. Returns how many were signalled.
    pub fn kill_encoders(&self, path: &Path) -> usize {
        let count = self.inner.locks.cancel(path);
        if count > 0 {
            tracing::info!(path = %path.display(), count, "Killing encoder processes for file");
        }
        count
    }

    /// Number of running streams.
    pub fn stream_count(&self) -> usize {
        self.inner
            .streams
            .lock()
            .as_ref()
            .map(HashMap::len)
            .unwrap_or(0)
    }

    /// Snapshot of all running streams, sorted by directory.
    pub fn status(&self) -> Vec<StreamStatus> {
        let guard = self.inner.streams.lock();
        let Some(streams) = guard.as_ref() else {
            return Vec::new();
        };

        let now = Instant::now();
        let mut status: Vec<StreamStatus> = streams
            .values()
            .map(|s| StreamStatus {
                dir: s.dir.clone(),
                profile: s.stream_type.to_string(),
                last_segment: s.last_segment,
                waiting: s.waiting.len(),
                idle_secs: now.saturating_duration_since(s.last_accessed).as_secs(),
                process: s.process.as_ref().map(|p| ProcessStatus {
                    start_index: p.start_index(),
                    segment: p.segment(),
                    state: p.state(),
                    stopping: p.is_stopping(),
                }),
            })
            .collect();
        status.sort_by(|a, b| a.dir.cmp(&b.dir));
        status
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.streams.lock().is_none()
    }

    /// Stop all streams and remove their files.
    ///
    /// Pending requests are answered with [`StreamError::Cancelled`] and
    /// later requests fail with [`StreamError::ShuttingDown`].
    pub fn shutdown(&self) {
        self.inner.shutdown.cancel();

        let Some(streams) = self.inner.streams.lock().take() else {
            return;
        };

        for (_, mut stream) in streams {
            for segment in stream.waiting.iter_mut() {
                segment.deliver(Err(StreamError::Cancelled));
            }
            stop_transcode(&stream);
            remove_transcode_files(&stream);
        }

        tracing::info!("Stream manager shut down");
    }
}

fn stop_transcode(stream: &RunningStream) {
    if let Some(process) = &stream.process {
        process.stop();
    }
}

fn remove_transcode_files(stream: &RunningStream) {
    if let Err(e) = std::fs::remove_dir_all(&stream.output_dir) {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(
                path = %stream.output_dir.display(),
                error = %e,
                "Error removing segment directory"
            );
        }
    }
}

async fn read_pipe<R: AsyncRead + Unpin>(pipe: Option<R>) -> String {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_end(&mut buf).await;
    }
    String::from_utf8_lossy(&buf).trim().to_string()
}

/// Wait for an encoder to exit, then record the outcome on its stream.
async fn supervise(
    inner: Arc<Inner>,
    dir: String,
    id: u64,
    mut child: Child,
    lock: ReadLock,
    args: Args,
) {
    let token = lock.token().clone();
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let exit = async {
        tokio::select! {
            status = child.wait() => status,
            _ = token.cancelled() => {
                if let Err(e) = child.start_kill() {
                    tracing::debug!(dir = %dir, error = %e, "Failed to kill encoder");
                }
                child.wait().await
            }
        }
    };

    let (stdout, stderr, exit) = tokio::join!(read_pipe(stdout), read_pipe(stderr), exit);

    // A stop request wins over however the process happened to exit
    let state = if token.is_cancelled() {
        ProcessState::Cancelled
    } else {
        match &exit {
            Ok(status) if status.success() => ProcessState::ExitedOk,
            _ => ProcessState::ExitedError,
        }
    };

    drop(lock);

    match state {
        ProcessState::ExitedError => {
            let message = if !stderr.is_empty() {
                stderr
            } else if !stdout.is_empty() {
                stdout
            } else {
                match &exit {
                    Ok(status) => status.to_string(),
                    Err(e) => e.to_string(),
                }
            };
            tracing::error!(
                dir = %dir,
                command = %args,
                error = %message,
                "Encoder failed"
            );
        }
        ProcessState::Cancelled => tracing::debug!(dir = %dir, "Transcode cancelled"),
        _ => tracing::debug!(dir = %dir, "Transcode finished"),
    }

    let mut guard = inner.streams.lock();
    let Some(stream) = guard.as_mut().and_then(|streams| streams.get_mut(&dir)) else {
        return;
    };

    if stream.process.as_ref().is_some_and(|p| p.id == id) {
        if let Some(mut process) = stream.process.take() {
            process.set_state(state);
            // Clear remaining segments after exit
            process.check_segments();
        }
    }
}
