//! Control facade: the request/response boundary over the playlist and
//! the supervisor.
//!
//! Every verb returns either a payload, a [`Rejection`] (the request is not
//! valid right now) or a failure message (something broke). Surfaces such as
//! the HTTP layer only ever talk to this type.

use std::sync::Arc;

use thiserror::Error;
use tracing::{error, instrument};
use uuid::Uuid;

use loopcast_ipc::{MediaItem, PlaylistStatus, Rejection, StreamStatus};
use loopcast_playlist::{PlaylistError, PlaylistStore};

use crate::{EngineError, Supervisor};

/// Outcome of a refused or failed control request.
#[derive(Debug, Error)]
pub enum ControlError {
    /// The request is invalid for the current input or phase.
    #[error("{}", .0.message())]
    Rejected(Rejection),

    /// Something went wrong while carrying out a valid request.
    #[error("{0}")]
    Failed(String),
}

impl ControlError {
    /// The rejection reason, if any.
    pub fn rejection(&self) -> Option<Rejection> {
        match self {
            Self::Rejected(rejection) => Some(*rejection),
            Self::Failed(_) => None,
        }
    }
}

impl From<Rejection> for ControlError {
    fn from(rejection: Rejection) -> Self {
        Self::Rejected(rejection)
    }
}

impl From<EngineError> for ControlError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::Rejected(rejection) => Self::Rejected(rejection),
            other => {
                error!("{}", other);
                Self::Failed(other.to_string())
            }
        }
    }
}

impl From<PlaylistError> for ControlError {
    fn from(e: PlaylistError) -> Self {
        error!("{}", e);
        Self::Failed(e.to_string())
    }
}

/// Result type for control requests.
pub type ControlResult<T> = Result<T, ControlError>;

/// Playback and playlist controls.
#[derive(Clone)]
pub struct Controller {
    playlist: Arc<PlaylistStore>,
    supervisor: Supervisor,
}

impl Controller {
    /// Wrap a supervisor and its playlist.
    pub fn new(supervisor: Supervisor) -> Self {
        Self {
            playlist: Arc::clone(supervisor.playlist()),
            supervisor,
        }
    }

    /// The underlying supervisor.
    pub fn supervisor(&self) -> &Supervisor {
        &self.supervisor
    }

    /// Append an already-stored media file to the playlist.
    #[instrument(skip(self))]
    pub fn add_item(
        &self,
        source_ref: &str,
        display_name: &str,
        size_bytes: u64,
        duration_seconds: Option<f64>,
    ) -> ControlResult<MediaItem> {
        Ok(self
            .playlist
            .add(source_ref, display_name, size_bytes, duration_seconds)?)
    }

    /// Playlist view with the current play flag. Never rejects.
    pub fn list_status(&self) -> PlaylistStatus {
        self.supervisor.status().playlist
    }

    /// Remove an item.
    #[instrument(skip(self))]
    pub fn remove_item(&self, id: Uuid) -> ControlResult<()> {
        if self.playlist.remove(id)? {
            Ok(())
        } else {
            Err(Rejection::NotFound.into())
        }
    }

    /// Reorder the playlist; `order` must be a permutation of the ids.
    #[instrument(skip(self, order), fields(len = order.len()))]
    pub fn reorder(&self, order: &[Uuid]) -> ControlResult<()> {
        if self.playlist.reorder(order)? {
            Ok(())
        } else {
            Err(Rejection::InvalidOrder.into())
        }
    }

    /// Empty the playlist.
    #[instrument(skip(self))]
    pub fn clear(&self) -> ControlResult<()> {
        Ok(self.playlist.clear()?)
    }

    /// Point the cursor at `index`.
    #[instrument(skip(self))]
    pub fn set_current(&self, index: usize) -> ControlResult<()> {
        if self.playlist.set_current_index(index) {
            Ok(())
        } else {
            Err(Rejection::InvalidIndex.into())
        }
    }

    /// Start streaming and report the resulting status.
    pub fn start(&self) -> ControlResult<StreamStatus> {
        self.supervisor.start()?;
        Ok(self.supervisor.status())
    }

    /// Stop streaming. Always succeeds.
    pub fn stop(&self) -> ControlResult<()> {
        Ok(self.supervisor.stop()?)
    }

    /// Pause the running stream.
    pub fn pause(&self) -> ControlResult<()> {
        Ok(self.supervisor.pause()?)
    }

    /// Resume the paused stream.
    pub fn resume(&self) -> ControlResult<()> {
        Ok(self.supervisor.resume()?)
    }

    /// Full status. Safe in any phase.
    pub fn status(&self) -> StreamStatus {
        self.supervisor.status()
    }
}
