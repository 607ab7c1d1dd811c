//! Common types used across engine messages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state::StreamPhase;

/// Manifest file name the encoder writes into the stream directory.
pub const STREAM_MANIFEST: &str = "stream.m3u8";

/// A playlist entry.
///
/// Records are immutable once created; the playlist only ever inserts or
/// removes whole entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    /// Identifier assigned at insertion.
    pub id: Uuid,

    /// Location of the media file on disk.
    #[serde(rename = "path")]
    pub source_ref: String,

    /// Original file name as supplied by the uploader.
    #[serde(rename = "originalName")]
    pub display_name: String,

    /// File size in bytes.
    #[serde(rename = "size", default)]
    pub size_bytes: u64,

    /// Probed duration, absent when probing failed.
    #[serde(rename = "duration", default)]
    pub duration_seconds: Option<f64>,

    /// Insertion time.
    pub added_at: DateTime<Utc>,
}

impl MediaItem {
    /// Create a record with a fresh id, stamped now.
    pub fn new(
        source_ref: impl Into<String>,
        display_name: impl Into<String>,
        size_bytes: u64,
        duration_seconds: Option<f64>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_ref: source_ref.into(),
            display_name: display_name.into(),
            size_bytes,
            duration_seconds,
            added_at: Utc::now(),
        }
    }

    /// Compact view used in status payloads.
    pub fn summary(&self) -> ItemSummary {
        ItemSummary {
            id: self.id,
            name: self.display_name.clone(),
            duration: self.duration_seconds,
            added_at: self.added_at,
        }
    }
}

/// Compact item view for status reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemSummary {
    pub id: Uuid,
    pub name: String,
    pub duration: Option<f64>,
    pub added_at: DateTime<Utc>,
}

/// Playlist view: items, cursor and play flag.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistStatus {
    /// Whether playback is currently wanted.
    pub is_playing: bool,

    /// Position of the current item.
    pub current_index: usize,

    /// Number of items.
    pub total_items: usize,

    /// Item at `current_index`, if any.
    pub current_item: Option<ItemSummary>,

    /// All items in playback order.
    pub items: Vec<ItemSummary>,
}

/// Full stream status, safe to request in any phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamStatus {
    /// Current session phase.
    pub phase: StreamPhase,

    /// Whether an encoder process is alive.
    pub process_active: bool,

    /// Source the running encoder was launched on.
    pub current_source: Option<String>,

    /// Manifest URL while an encoder is alive.
    pub stream_url: Option<String>,

    /// Number of relaunches after unrequested exits.
    pub restarts: u64,

    /// Playlist view.
    pub playlist: PlaylistStatus,
}

/// How an encoder process ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitCause {
    /// Input exhausted and the process exited cleanly.
    Completed,

    /// The process exited with a failure status.
    Failed { code: Option<i32> },

    /// The process was killed.
    Killed,
}

impl ExitCause {
    /// Returns a display message for this cause.
    pub fn message(&self) -> String {
        match self {
            Self::Completed => "Encoder finished".to_string(),
            Self::Failed { code: Some(code) } => format!("Encoder failed with status {code}"),
            Self::Failed { code: None } => "Encoder failed".to_string(),
            Self::Killed => "Encoder killed".to_string(),
        }
    }
}

/// Reasons a control request is refused without anything having broken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rejection {
    /// The referenced item does not exist.
    NotFound,

    /// The reorder list is not a permutation of the current ids.
    InvalidOrder,

    /// The index is outside the playlist.
    InvalidIndex,

    /// A stream is already starting or running.
    AlreadyActive,

    /// There is nothing to play.
    EmptyPlaylist,

    /// Pause/resume without a matching running stream.
    NoActiveStream,

    /// The current item's media file is gone.
    SourceMissing,

    /// The uploaded payload is not acceptable.
    InvalidUpload,

    /// A stop arrived while the stream was still starting.
    Interrupted,
}

impl Rejection {
    /// Returns a display message for this rejection.
    pub fn message(self) -> &'static str {
        match self {
            Self::NotFound => "Video not found",
            Self::InvalidOrder => "Invalid order array",
            Self::InvalidIndex => "Invalid index",
            Self::AlreadyActive => "Stream already active",
            Self::EmptyPlaylist => "No videos in playlist",
            Self::NoActiveStream => "No active stream",
            Self::SourceMissing => "Video file not found",
            Self::InvalidUpload => "Invalid file type. Only video files are allowed.",
            Self::Interrupted => "Stream start interrupted by stop",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_item_tolerates_missing_and_unknown_fields() {
        let json = r#"{
            "id": "6f1c1f5e-3a55-4a8e-9d4c-0b8f0f0e2a11",
            "filename": "legacy-field.mp4",
            "path": "/srv/uploads/a.mp4",
            "originalName": "a.mp4",
            "addedAt": "2024-03-01T10:00:00Z"
        }"#;

        let item: MediaItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.source_ref, "/srv/uploads/a.mp4");
        assert_eq!(item.size_bytes, 0);
        assert_eq!(item.duration_seconds, None);
    }

    #[test]
    fn test_media_item_ids_are_unique() {
        let a = MediaItem::new("/a.mp4", "a.mp4", 1, None);
        let b = MediaItem::new("/a.mp4", "a.mp4", 1, None);
        assert_ne!(a.id, b.id);
        assert_eq!(a.summary().name, "a.mp4");
    }

    #[test]
    fn test_exit_cause_message() {
        assert_eq!(
            ExitCause::Failed { code: Some(1) }.message(),
            "Encoder failed with status 1"
        );
    }
}
