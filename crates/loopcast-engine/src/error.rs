//! Error types for the engine.

use thiserror::Error;

use loopcast_encoder::EncoderError;
use loopcast_ipc::Rejection;
use loopcast_playlist::PlaylistError;

/// Errors returned by supervisor operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The request is invalid for the current input or phase.
    #[error("{}", .0.message())]
    Rejected(Rejection),

    /// Playlist persistence failed.
    #[error(transparent)]
    Playlist(#[from] PlaylistError),

    /// The encoder could not be launched or signalled.
    #[error(transparent)]
    Encoder(#[from] EncoderError),
}

impl From<Rejection> for EngineError {
    fn from(rejection: Rejection) -> Self {
        Self::Rejected(rejection)
    }
}

impl EngineError {
    /// The rejection reason, if this is a refusal rather than a fault.
    pub fn rejection(&self) -> Option<Rejection> {
        match self {
            Self::Rejected(rejection) => Some(*rejection),
            _ => None,
        }
    }
}
