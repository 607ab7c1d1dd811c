//! HTTP handlers for playlist and stream control.

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, instrument};
use uuid::Uuid;

use loopcast_ipc::{PlaylistStatus, Rejection, StreamStatus};

use crate::response::{ApiError, ApiResponse, ApiResult};
use crate::AppState;

/// GET /health
pub async fn health() -> Json<Value> {
    Json(json!({
        "success": true,
        "message": "Server is running",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// GET / - endpoint index.
pub async fn index() -> Json<Value> {
    Json(json!({
        "name": "loopcast",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Live streaming server with video upload and HLS streaming",
        "endpoints": {
            "upload": {
                "POST /api/upload": "Upload a video to the playlist (multipart/form-data with field \"video\")",
            },
            "playlist": {
                "GET /api/playlist": "Get playlist and current status",
                "DELETE /api/playlist/:videoId": "Remove video from playlist",
                "POST /api/playlist/reorder": "Reorder playlist (body: { order: [id1, id2, ...] })",
                "DELETE /api/playlist": "Clear entire playlist",
                "POST /api/playlist/current/:index": "Set current video by index",
            },
            "stream": {
                "POST /api/stream/start": "Start streaming",
                "POST /api/stream/stop": "Stop streaming",
                "POST /api/stream/pause": "Pause streaming",
                "POST /api/stream/resume": "Resume streaming",
                "GET /api/stream/status": "Get stream status",
                "GET /stream/stream.m3u8": "HLS stream playlist (use in video player)",
            },
            "utility": {
                "GET /health": "Health check endpoint",
            },
        },
    }))
}

/// GET /api/playlist
pub async fn get_playlist(State(state): State<AppState>) -> ApiResult<PlaylistStatus> {
    Ok(ApiResponse::data(state.controller.list_status()))
}

/// DELETE /api/playlist/:video_id
#[instrument(skip(state))]
pub async fn remove_item(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> ApiResult<()> {
    let id = Uuid::parse_str(&video_id).map_err(|_| ApiError::from(Rejection::NotFound))?;
    state.controller.remove_item(id)?;
    Ok(ApiResponse::ok("Video removed from playlist"))
}

/// POST /api/playlist/reorder
#[instrument(skip(state, body))]
pub async fn reorder(State(state): State<AppState>, Json(body): Json<Value>) -> ApiResult<()> {
    let Some(order) = body.get("order").and_then(Value::as_array) else {
        return Err(ApiError::bad_request("Order must be an array of video IDs"));
    };

    let ids = order
        .iter()
        .map(|value| value.as_str().and_then(|s| Uuid::parse_str(s).ok()))
        .collect::<Option<Vec<_>>>()
        .ok_or(Rejection::InvalidOrder)?;

    state.controller.reorder(&ids)?;
    Ok(ApiResponse::ok("Playlist reordered"))
}

/// DELETE /api/playlist
#[instrument(skip(state))]
pub async fn clear(State(state): State<AppState>) -> ApiResult<()> {
    state.controller.clear()?;
    Ok(ApiResponse::ok("Playlist cleared"))
}

/// POST /api/playlist/current/:index
#[instrument(skip(state))]
pub async fn set_current(
    State(state): State<AppState>,
    Path(index): Path<String>,
) -> ApiResult<()> {
    let index: usize = index.parse().map_err(|_| Rejection::InvalidIndex)?;
    state.controller.set_current(index)?;
    Ok(ApiResponse::ok("Current video set"))
}

/// POST /api/stream/start
#[instrument(skip(state))]
pub async fn start_stream(State(state): State<AppState>) -> ApiResult<StreamStatus> {
    debug!("start_stream request");
    let status = state.controller.start()?;
    Ok(ApiResponse::with_message("Stream started", status))
}

/// POST /api/stream/stop
#[instrument(skip(state))]
pub async fn stop_stream(State(state): State<AppState>) -> ApiResult<()> {
    debug!("stop_stream request");
    state.controller.stop()?;
    Ok(ApiResponse::ok("Stream stopped"))
}

/// POST /api/stream/pause
#[instrument(skip(state))]
pub async fn pause_stream(State(state): State<AppState>) -> ApiResult<()> {
    state.controller.pause()?;
    Ok(ApiResponse::ok("Stream paused"))
}

/// POST /api/stream/resume
#[instrument(skip(state))]
pub async fn resume_stream(State(state): State<AppState>) -> ApiResult<()> {
    state.controller.resume()?;
    Ok(ApiResponse::ok("Stream resumed"))
}

/// GET /api/stream/status
pub async fn stream_status(State(state): State<AppState>) -> ApiResult<StreamStatus> {
    Ok(ApiResponse::data(state.controller.status()))
}
