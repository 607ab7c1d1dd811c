//! Multipart media upload.

use std::path::Path;
use std::time::Duration;

use axum::extract::multipart::{Field, MultipartError};
use axum::extract::{Multipart, State};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use loopcast_encoder::probe_duration;
use loopcast_ipc::{ItemSummary, Rejection};

use crate::response::{ApiError, ApiResponse, ApiResult};
use crate::AppState;

/// Multipart field carrying the media file.
pub const UPLOAD_FIELD: &str = "video";

/// Accepted media types.
pub const ALLOWED_MIME_TYPES: &[&str] = &[
    "video/mp4",
    "video/mpeg",
    "video/quicktime",
    "video/x-msvideo",
    "video/x-matroska",
    "video/webm",
];

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// POST /api/upload
#[instrument(skip(state, multipart))]
pub async fn upload(State(state): State<AppState>, mut multipart: Multipart) -> ApiResult<ItemSummary> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let content_type = field.content_type().unwrap_or_default().to_string();
        if !ALLOWED_MIME_TYPES.contains(&content_type.as_str()) {
            warn!(%content_type, "Rejected upload type");
            return Err(Rejection::InvalidUpload.into());
        }

        let original_name = field
            .file_name()
            .and_then(|name| Path::new(name).file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .filter(|name| !name.is_empty())
            .ok_or_else(|| ApiError::bad_request("No video file provided"))?;

        let dest = state
            .config
            .upload_dir
            .join(format!("{}-{}", Uuid::new_v4(), original_name));

        let size = match save_field(field, &dest).await {
            Ok(size) => size,
            Err(e) => {
                let _ = fs::remove_file(&dest).await;
                return Err(e);
            }
        };

        let duration = probe_duration(&state.config.ffprobe, &dest, PROBE_TIMEOUT).await;
        if duration.is_none() {
            warn!(path = %dest.display(), "Could not get video duration");
        }

        let item = state.controller.add_item(
            &dest.to_string_lossy(),
            &original_name,
            size,
            duration,
        )?;

        info!(id = %item.id, name = %item.display_name, size, "Video uploaded");
        return Ok(ApiResponse::with_message(
            "Video uploaded successfully",
            item.summary(),
        ));
    }

    Err(ApiError::bad_request("No video file provided"))
}

async fn save_field(mut field: Field<'_>, dest: &Path) -> Result<u64, ApiError> {
    let mut file = fs::File::create(dest)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to store upload: {e}")))?;

    let mut size = 0u64;
    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        size += chunk.len() as u64;
        file.write_all(&chunk)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to store upload: {e}")))?;
    }

    file.flush()
        .await
        .map_err(|e| ApiError::internal(format!("Failed to store upload: {e}")))?;
    Ok(size)
}

fn multipart_error(e: MultipartError) -> ApiError {
    ApiError {
        status: e.status(),
        message: e.body_text(),
    }
}
