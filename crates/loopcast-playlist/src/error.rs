//! Error types for the playlist store.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while persisting the playlist.
#[derive(Debug, Error)]
pub enum PlaylistError {
    /// The snapshot directory could not be created.
    #[error("Failed to prepare playlist directory {path}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing the snapshot failed.
    #[error("Failed to write playlist snapshot {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Encoding the snapshot failed.
    #[error("Failed to encode playlist snapshot: {0}")]
    Encode(#[from] serde_json::Error),
}
