use crate::config::Config;
use crate::library::{Library, ScanSummary};
use crate::streaming::{self, StreamManager};
use anyhow::{Context, Result};
use axum::{
    http::{header, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use streamforge_av::{get_tool_path, FFMpeg, FFProbe, Prober};
use streamforge_common::ReadLockManager;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

mod error;
pub mod routes_library;

pub use error::AppError;

/// Shared application context
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub streams: StreamManager,
    pub library: Arc<Library>,
}

impl AppContext {
    /// Wire up the library and stream manager.
    pub fn new(config: Config, encoder: FFMpeg, prober: Arc<dyn Prober>) -> Self {
        let library = Library::new(&config.library, Arc::clone(&prober));
        let streams =
            StreamManager::new(config.streaming.clone(), encoder, prober, ReadLockManager::new());

        Self {
            config: Arc::new(config),
            streams,
            library: Arc::new(library),
        }
    }

    /// Build a context using the ffmpeg and ffprobe binaries from the config
    /// or `PATH`.
    pub fn from_config(config: Config) -> Result<Self> {
        let ffmpeg = get_tool_path("ffmpeg", config.tools.ffmpeg_path.as_deref())
            .context("ffmpeg is required for streaming")?;
        let ffprobe = get_tool_path("ffprobe", config.tools.ffprobe_path.as_deref())
            .context("ffprobe is required for streaming")?;

        Ok(Self::new(
            config,
            FFMpeg::new(ffmpeg),
            Arc::new(FFProbe::new(ffprobe)),
        ))
    }

    /// Rescan the library and stop encoders reading files that changed or
    /// disappeared.
    pub async fn scan_library(&self) -> Result<ScanSummary, tokio::task::JoinError> {
        let library = Arc::clone(&self.library);
        let summary = tokio::task::spawn_blocking(move || library.scan()).await?;

        for path in &summary.stale {
            self.streams.kill_encoders(path);
        }

        Ok(summary)
    }
}

/// Create the Axum router with all routes
pub fn create_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::RANGE]);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", routes_library::library_routes())
        .nest("/api/stream", streaming::router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}

/// Start the HTTP server.
///
/// Scans the library, starts the stream monitor, and on shutdown stops every
/// encoder and removes the segment cache.
pub async fn start_server(config: Config) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let ctx = AppContext::from_config(config)?;

    let summary = ctx.scan_library().await?;
    tracing::info!("Library contains {} video files", summary.total);

    let monitor = ctx.streams.spawn_monitor();
    let streams = ctx.streams.clone();
    let app = create_router(ctx);

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Pending segment requests are answered before connections drain
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            streams.shutdown();
        })
        .await?;

    if let Err(e) = monitor.await {
        tracing::warn!("Stream monitor task failed: {}", e);
    }

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
