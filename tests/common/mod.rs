//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which builds a full [`AppContext`] around a
//! temporary media library, a temporary segment cache, a fixed prober, and a
//! fake encoder script that writes numbered segment files the way ffmpeg's
//! HLS muxer does.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

use streamforge::config::{Config, StreamingConfig};
use streamforge::server::{create_router, AppContext};
use streamforge_av::{FFMpeg, Prober, Result as AvResult, VideoFile};

/// Prober that reports the same metadata for every file.
pub struct FixedProber {
    pub duration: f64,
    pub audio_codec: Option<String>,
}

impl Prober for FixedProber {
    fn probe(&self, path: &Path) -> AvResult<VideoFile> {
        Ok(VideoFile {
            path: path.to_path_buf(),
            duration: self.duration,
            width: 1920,
            height: 1080,
            audio_codec: self.audio_codec.clone(),
        })
    }
}

/// Behaviour of the fake encoder script.
#[derive(Debug, Clone)]
pub struct FakeEncoder {
    /// Segments the encoder writes before exiting, counted from index 0.
    pub total_segments: u32,
    /// Seconds between segments.
    pub delay: &'static str,
}

impl Default for FakeEncoder {
    fn default() -> Self {
        Self {
            total_segments: 5,
            delay: "0.02",
        }
    }
}

/// Write an executable shell script standing in for ffmpeg.
///
/// It writes `.N.ts` files from `-start_number` using the pattern given to
/// `-hls_segment_filename`, and appends `start=N` to `log` on every run.
#[cfg(unix)]
pub fn write_fake_encoder(dir: &Path, encoder: &FakeEncoder, log: &Path) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let script = format!(
        r#"#!/bin/sh
start=0
pattern=""
while [ $# -gt 0 ]; do
  case "$1" in
    -start_number) start="$2"; shift ;;
    -hls_segment_filename) pattern="$2"; shift ;;
  esac
  shift
done
echo "start=$start" >> "{log}"
i=$start
while [ $i -lt {total} ]; do
  file=$(printf "$pattern" $i)
  printf "segment $i" > "$file" || exit 1
  i=$((i + 1))
  sleep {delay}
done
exit 0
"#,
        log = log.display(),
        total = encoder.total_segments,
        delay = encoder.delay,
    );

    let path = dir.join("fake-ffmpeg");
    std::fs::write(&path, script).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

/// Test harness wrapping a fully-constructed [`AppContext`].
pub struct TestHarness {
    pub ctx: AppContext,
    pub media_dir: TempDir,
    pub cache_dir: TempDir,
    pub tools_dir: TempDir,
    pub encoder_log: PathBuf,
}

impl TestHarness {
    /// Harness for a 10 second source with the default fake encoder.
    #[cfg(unix)]
    pub fn new() -> Self {
        Self::with_encoder(10.0, FakeEncoder::default())
    }

    #[cfg(unix)]
    pub fn with_encoder(duration: f64, encoder: FakeEncoder) -> Self {
        let tools_dir = tempfile::tempdir().unwrap();
        let encoder_log = tools_dir.path().join("invocations.log");
        let script = write_fake_encoder(tools_dir.path(), &encoder, &encoder_log);
        Self::build(duration, FFMpeg::new(script), tools_dir, encoder_log, true)
    }

    /// Harness whose encoder binary does not exist.
    pub fn without_encoder(duration: f64) -> Self {
        let tools_dir = tempfile::tempdir().unwrap();
        let encoder_log = tools_dir.path().join("invocations.log");
        let encoder = FFMpeg::new(tools_dir.path().join("missing-ffmpeg"));
        Self::build(duration, encoder, tools_dir, encoder_log, true)
    }

    /// Harness with no segment cache configured.
    pub fn without_cache_dir() -> Self {
        let tools_dir = tempfile::tempdir().unwrap();
        let encoder_log = tools_dir.path().join("invocations.log");
        let encoder = FFMpeg::new(tools_dir.path().join("missing-ffmpeg"));
        Self::build(10.0, encoder, tools_dir, encoder_log, false)
    }

    fn build(
        duration: f64,
        encoder: FFMpeg,
        tools_dir: TempDir,
        encoder_log: PathBuf,
        with_cache: bool,
    ) -> Self {
        let media_dir = tempfile::tempdir().unwrap();
        let cache_dir = tempfile::tempdir().unwrap();

        let mut config = Config::default();
        config.library.paths = vec![media_dir.path().to_path_buf()];
        config.streaming = StreamingConfig {
            cache_dir: with_cache.then(|| cache_dir.path().to_path_buf()),
            monitor_interval_ms: 20,
            ..StreamingConfig::default()
        };

        let prober = Arc::new(FixedProber {
            duration,
            audio_codec: Some("aac".to_string()),
        });
        let ctx = AppContext::new(config, encoder, prober);

        // Sync tests drive the monitor by hand
        if tokio::runtime::Handle::try_current().is_ok() {
            ctx.streams.spawn_monitor();
        }

        Self {
            ctx,
            media_dir,
            cache_dir,
            tools_dir,
            encoder_log,
        }
    }

    /// Create a media file, rescan, and return its id.
    pub fn add_media(&self, name: &str) -> String {
        let path = self.media_dir.path().join(name);
        std::fs::write(&path, b"not really a video").unwrap();
        self.ctx.library.scan();
        self.ctx
            .library
            .list()
            .into_iter()
            .find(|e| e.path == path)
            .map(|e| e.id)
            .unwrap()
    }

    /// Cache directory hash of a media file.
    pub fn media_hash(&self, id: &str) -> String {
        self.ctx.library.get(id).unwrap().hash
    }

    pub fn app(&self) -> Router {
        create_router(self.ctx.clone())
    }

    /// Issue a GET request against the router.
    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.app()
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    /// Encoder start indices, in launch order.
    pub fn encoder_starts(&self) -> Vec<u32> {
        std::fs::read_to_string(&self.encoder_log)
            .unwrap_or_default()
            .lines()
            .filter_map(|l| l.strip_prefix("start="))
            .filter_map(|n| n.parse().ok())
            .collect()
    }

    /// Poll until `check` passes or `timeout` elapses.
    pub async fn wait_for(&self, timeout: Duration, mut check: impl FnMut(&Self) -> bool) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            if check(self) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        check(self)
    }
}

/// Helper to get response body as string
pub async fn body_to_string(body: Body) -> String {
    let bytes = body.collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}
