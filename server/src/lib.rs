//! loopcast server: HTTP control surface over the stream supervisor.

pub mod config;
mod response;
mod routes;
mod upload;

use std::fs;
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread;

use anyhow::{bail, Context, Result};
use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post};
use axum::Router;
use crossbeam_channel::Receiver;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use loopcast_encoder::{ensure_stream_dir, FfmpegLauncher};
use loopcast_engine::{create_controller, Controller};
use loopcast_ipc::{event_channel, StreamEvent, STREAM_MANIFEST};
use loopcast_playlist::PlaylistStore;

pub use config::Config;

/// State shared with every handler.
#[derive(Clone)]
pub struct AppState {
    pub controller: Controller,
    pub config: Arc<Config>,
}

/// Initialize logging.
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "loopcast=debug,loopcast_engine=debug,loopcast_playlist=debug,loopcast_encoder=debug,tower_http=info".into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let stream_dir = state.config.stream_dir.clone();
    let body_limit = state.config.max_upload_bytes();

    Router::new()
        .route("/", get(routes::index))
        .route("/health", get(routes::health))
        .route("/api/upload", post(upload::upload))
        .route("/api/playlist", get(routes::get_playlist).delete(routes::clear))
        .route("/api/playlist/reorder", post(routes::reorder))
        .route("/api/playlist/current/:index", post(routes::set_current))
        .route("/api/playlist/:video_id", delete(routes::remove_item))
        .route("/api/stream/start", post(routes::start_stream))
        .route("/api/stream/stop", post(routes::stop_stream))
        .route("/api/stream/pause", post(routes::pause_stream))
        .route("/api/stream/resume", post(routes::resume_stream))
        .route("/api/stream/status", get(routes::stream_status))
        .nest_service("/stream", ServeDir::new(stream_dir))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Open the playlist, wire the supervisor and build the handler state.
pub fn build_state(config: Config) -> Result<(AppState, Receiver<StreamEvent>)> {
    for dir in [&config.upload_dir, &config.stream_dir] {
        ensure_stream_dir(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    // The stream directory is wiped on every start.
    let upload_dir = fs::canonicalize(&config.upload_dir)
        .with_context(|| format!("Failed to resolve {}", config.upload_dir.display()))?;
    let stream_dir = fs::canonicalize(&config.stream_dir)
        .with_context(|| format!("Failed to resolve {}", config.stream_dir.display()))?;
    if upload_dir == stream_dir {
        bail!(
            "Stream directory {} must differ from the upload directory",
            config.stream_dir.display()
        );
    }

    let playlist = Arc::new(
        PlaylistStore::open(config.snapshot_path()).context("Failed to open playlist")?,
    );
    let launcher = Arc::new(FfmpegLauncher::new(config.encoder_config()));
    let (event_tx, event_rx) = event_channel();

    let controller = create_controller(playlist, launcher, config.supervisor_config(), event_tx);

    Ok((
        AppState {
            controller,
            config: Arc::new(config),
        },
        event_rx,
    ))
}

/// Run the server until Ctrl+C / SIGTERM, then stop the stream.
pub async fn run(config: Config) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let (state, event_rx) = build_state(config)?;

    info!("Upload directory: {}", state.config.upload_dir.display());
    info!("Stream directory: {}", state.config.stream_dir.display());
    info!("HLS segment duration: {}s", state.config.hls_segment_duration);
    info!("Stream URL: http://localhost:{}/stream/{}", addr.port(), STREAM_MANIFEST);

    spawn_event_logger(event_rx);

    let controller = state.controller.clone();
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("Server running on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    controller.supervisor().shutdown();
    info!("Server shutdown complete");
    Ok(())
}

/// Log supervisor events until every sender is gone.
fn spawn_event_logger(event_rx: Receiver<StreamEvent>) {
    thread::spawn(move || {
        for event in event_rx.iter() {
            match event {
                StreamEvent::PhaseChanged { previous, current } => {
                    debug!(previous = previous.name(), current = current.name(), "Phase changed");
                }
                StreamEvent::EncoderStarted { pid, source, inputs } => {
                    info!(?pid, %source, inputs, "Encoder started");
                }
                StreamEvent::EncoderExited { cause } => {
                    warn!(cause = %cause.message(), "Encoder exited");
                }
                StreamEvent::RestartScheduled { delay_ms } => {
                    info!(delay_ms, "Restart scheduled");
                }
                StreamEvent::Error { message } => {
                    error!(%message, "Supervisor error");
                }
            }
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
