//! Core supervisor for loopcast.
//!
//! This crate runs the stream state machine on top of the playlist store and
//! the external encoder, and exposes a control facade that the HTTP layer
//! maps onto requests.

mod control;
mod error;
mod policy;
mod session;
mod supervisor;

#[cfg(test)]
mod testing;

pub use control::{ControlError, ControlResult, Controller};
pub use error::EngineError;
pub use policy::{RestartPolicy, DEFAULT_RESTART_DELAY_MS};
pub use supervisor::{Supervisor, SupervisorConfig};

use std::sync::Arc;

use crossbeam_channel::Sender;

use loopcast_encoder::EncoderLauncher;
use loopcast_ipc::StreamEvent;
use loopcast_playlist::PlaylistStore;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Create a supervisor and the control facade over it.
pub fn create_controller(
    playlist: Arc<PlaylistStore>,
    launcher: Arc<dyn EncoderLauncher>,
    config: SupervisorConfig,
    event_tx: Sender<StreamEvent>,
) -> Controller {
    let supervisor = Supervisor::new(playlist, launcher, config, event_tx);
    Controller::new(supervisor)
}
