//! Session state owned by the supervisor.

use tokio_util::sync::CancellationToken;

use loopcast_encoder::EncoderProcess;
use loopcast_ipc::StreamPhase;

/// Mutable state of the single streaming session.
///
/// Guarded by the supervisor's state lock. `generation` identifies the
/// current launch; any exit notification or pending relaunch carrying an
/// older generation is stale and ignored.
#[derive(Default)]
pub(crate) struct StreamSession {
    /// Lifecycle phase.
    pub phase: StreamPhase,

    /// The live encoder, at most one.
    pub process: Option<Box<dyn EncoderProcess>>,

    /// Source the live encoder was launched on.
    pub current_source: Option<String>,

    /// Playback intent; false after an explicit stop.
    pub wants_playback: bool,

    /// Bumped on every launch attempt and every stop.
    pub generation: u64,

    /// Cancels a relaunch waiting out its delay.
    pub restart_token: Option<CancellationToken>,

    /// Relaunches after unrequested exits.
    pub restarts: u64,
}

impl StreamSession {
    /// Create an idle session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new generation and return it.
    pub fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// Returns true if `generation` is still the live one and playback is wanted.
    pub fn is_current(&self, generation: u64) -> bool {
        self.generation == generation && self.wants_playback
    }

    /// Cancel any pending relaunch.
    pub fn cancel_restart(&mut self) {
        if let Some(token) = self.restart_token.take() {
            token.cancel();
        }
    }

    /// Drop the process handle and its source without signalling it.
    pub fn release_process(&mut self) -> Option<Box<dyn EncoderProcess>> {
        self.current_source = None;
        self.process.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_invalidation() {
        let mut session = StreamSession::new();
        session.wants_playback = true;
        let generation = session.next_generation();
        assert!(session.is_current(generation));

        session.next_generation();
        assert!(!session.is_current(generation));
    }

    #[test]
    fn test_cancel_restart_fires_token() {
        let mut session = StreamSession::new();
        let token = CancellationToken::new();
        session.restart_token = Some(token.clone());

        session.cancel_restart();

        assert!(token.is_cancelled());
        assert!(session.restart_token.is_none());
    }
}
