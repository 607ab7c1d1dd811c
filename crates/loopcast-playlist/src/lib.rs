//! Durable ordered playlist.
//!
//! The store keeps the playlist in memory, writes a JSON snapshot on every
//! mutation and tracks a process-local "current index" cursor that the
//! supervisor uses to pick what to stream.

mod error;
mod snapshot;
mod store;

pub use error::PlaylistError;
pub use store::PlaylistStore;

/// Result type for playlist operations.
pub type PlaylistResult<T> = Result<T, PlaylistError>;

/// File name of the snapshot inside the upload directory.
pub const SNAPSHOT_FILE: &str = "playlist.json";
