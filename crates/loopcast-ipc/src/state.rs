//! Stream state machine types.

use serde::{Deserialize, Serialize};

/// Lifecycle phase of the streaming session.
///
/// `Idle → Starting → Streaming → (Stopping → Idle) | (Paused ⇄ Streaming)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamPhase {
    /// No encoder is running and none is wanted.
    #[default]
    Idle,

    /// An encoder launch (or a post-crash relaunch) is in progress.
    Starting,

    /// The encoder is running.
    Streaming,

    /// The encoder is suspended.
    Paused,

    /// The encoder is being torn down.
    Stopping,
}

impl StreamPhase {
    /// Returns true if the session is idle.
    pub fn is_idle(self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Returns true if the encoder is running.
    pub fn is_streaming(self) -> bool {
        matches!(self, Self::Streaming)
    }

    /// Returns true if the encoder is suspended.
    pub fn is_paused(self) -> bool {
        matches!(self, Self::Paused)
    }

    /// Returns true if the session is being torn down.
    pub fn is_stopping(self) -> bool {
        matches!(self, Self::Stopping)
    }

    /// Returns a simple string representation of the phase.
    pub fn name(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Starting => "Starting",
            Self::Streaming => "Streaming",
            Self::Paused => "Paused",
            Self::Stopping => "Stopping",
        }
    }
}
