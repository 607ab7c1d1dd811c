//! Events sent from the engine to observers.

use serde::{Deserialize, Serialize};

use crate::state::StreamPhase;
use crate::types::ExitCause;

/// Events that the supervisor publishes while it runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StreamEvent {
    /// Session phase has changed.
    PhaseChanged {
        /// Previous phase.
        previous: StreamPhase,

        /// Current phase.
        current: StreamPhase,
    },

    /// An encoder process was launched.
    EncoderStarted {
        /// OS process id, when known.
        pid: Option<u32>,

        /// Source the session started on.
        source: String,

        /// Number of sources in the input list.
        inputs: usize,
    },

    /// The encoder terminated without being asked to.
    EncoderExited { cause: ExitCause },

    /// A relaunch was scheduled after an unrequested exit.
    RestartScheduled {
        /// Delay before the relaunch, in milliseconds.
        delay_ms: u64,
    },

    /// Error occurred.
    Error {
        /// Error message.
        message: String,
    },
}
