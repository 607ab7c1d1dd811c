//! Encode supervisor.

use std::path::Path;
use std::sync::Arc;

use crossbeam_channel::Sender;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use loopcast_encoder::{clean_stream_dir, EncoderLauncher, InputSpec};
use loopcast_ipc::{
    ExitCause, MediaItem, Rejection, StreamEvent, StreamPhase, StreamStatus, STREAM_MANIFEST,
};
use loopcast_playlist::PlaylistStore;

use crate::policy::RestartPolicy;
use crate::session::StreamSession;
use crate::{EngineError, EngineResult};

/// Supervisor configuration.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// What to do after the encoder exits on its own.
    pub restart_policy: RestartPolicy,

    /// URL path the stream directory is served under.
    pub stream_url_prefix: String,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            restart_policy: RestartPolicy::default(),
            stream_url_prefix: "/stream".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LaunchMode {
    /// Explicit start: the current item must be playable.
    Start,

    /// Relaunch after a fault: skip forward past missing sources.
    Restart,
}

struct Inner {
    playlist: Arc<PlaylistStore>,
    launcher: Arc<dyn EncoderLauncher>,
    config: SupervisorConfig,
    session: Mutex<StreamSession>,
    event_tx: Sender<StreamEvent>,
}

/// Owns the stream state machine and the encoder process.
///
/// All phase changes happen under one session lock; the lock is never held
/// across an await or a launch. Cloning yields another handle on the same
/// session. Methods that launch the encoder must run inside a Tokio runtime.
#[derive(Clone)]
pub struct Supervisor {
    inner: Arc<Inner>,
}

impl Supervisor {
    /// Create an idle supervisor.
    pub fn new(
        playlist: Arc<PlaylistStore>,
        launcher: Arc<dyn EncoderLauncher>,
        config: SupervisorConfig,
        event_tx: Sender<StreamEvent>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                playlist,
                launcher,
                config,
                session: Mutex::new(StreamSession::new()),
                event_tx,
            }),
        }
    }

    /// The playlist this supervisor streams from.
    pub fn playlist(&self) -> &Arc<PlaylistStore> {
        &self.inner.playlist
    }

    /// Current phase.
    pub fn phase(&self) -> StreamPhase {
        self.inner.session.lock().phase
    }

    /// Start streaming from the current item. Valid only from `Idle`.
    #[instrument(name = "start_stream", skip(self))]
    pub fn start(&self) -> EngineResult<()> {
        // Store calls may wait on a snapshot write; keep them off the session lock.
        if self.inner.playlist.is_empty() {
            warn!("No items in playlist");
            return Err(Rejection::EmptyPlaylist.into());
        }

        let generation = {
            let mut session = self.inner.session.lock();
            if !session.phase.is_idle() {
                debug!(phase = session.phase.name(), "Already active, rejecting start");
                return Err(Rejection::AlreadyActive.into());
            }

            session.wants_playback = true;
            let generation = session.next_generation();
            self.transition(&mut session, StreamPhase::Starting);
            generation
        };

        info!("Starting stream");
        if let Some(dir) = self.inner.launcher.stream_dir() {
            if let Err(e) = clean_stream_dir(dir) {
                warn!("Failed to clean stream directory: {}", e);
            }
        }

        match self.launch(generation, LaunchMode::Start) {
            Ok(()) => {
                info!("Stream started");
                Ok(())
            }
            Err(e) => {
                error!("Stream start failed: {}", e);
                self.settle_idle(generation);
                Err(e)
            }
        }
    }

    /// Kill the encoder and return to `Idle`. A no-op when already idle.
    #[instrument(name = "stop_stream", skip(self))]
    pub fn stop(&self) -> EngineResult<()> {
        let mut session = self.inner.session.lock();
        if session.phase.is_idle() {
            debug!("Already idle, ignoring stop");
            return Ok(());
        }

        info!(phase = session.phase.name(), "Stopping stream");
        self.transition(&mut session, StreamPhase::Stopping);

        session.wants_playback = false;
        session.next_generation();
        session.cancel_restart();

        if let Some(process) = session.release_process() {
            match process.terminate() {
                Ok(()) => info!("Encoder process killed"),
                Err(e) => warn!("Failed to kill encoder: {}", e),
            }
        }

        self.transition(&mut session, StreamPhase::Idle);
        info!("Stream stopped");
        Ok(())
    }

    /// Suspend the encoder. Valid only from `Streaming`.
    #[instrument(name = "pause_stream", skip(self))]
    pub fn pause(&self) -> EngineResult<()> {
        let mut session = self.inner.session.lock();
        if !session.phase.is_streaming() {
            return Err(Rejection::NoActiveStream.into());
        }
        let process = session.process.as_ref().ok_or(Rejection::NoActiveStream)?;

        process.suspend()?;
        self.transition(&mut session, StreamPhase::Paused);
        info!("Stream paused");
        Ok(())
    }

    /// Continue a suspended encoder. Valid only from `Paused`.
    #[instrument(name = "resume_stream", skip(self))]
    pub fn resume(&self) -> EngineResult<()> {
        let mut session = self.inner.session.lock();
        if !session.phase.is_paused() {
            return Err(Rejection::NoActiveStream.into());
        }
        let process = session.process.as_ref().ok_or(Rejection::NoActiveStream)?;

        process.resume()?;
        self.transition(&mut session, StreamPhase::Streaming);
        info!("Stream resumed");
        Ok(())
    }

    /// Side-effect-free status snapshot.
    pub fn status(&self) -> StreamStatus {
        let (phase, process_active, current_source, restarts, is_playing) = {
            let session = self.inner.session.lock();
            (
                session.phase,
                session.process.is_some(),
                session.current_source.clone(),
                session.restarts,
                session.wants_playback && !session.phase.is_paused(),
            )
        };

        StreamStatus {
            phase,
            process_active,
            current_source,
            stream_url: process_active.then(|| self.stream_url()),
            restarts,
            playlist: self.inner.playlist.status(is_playing),
        }
    }

    /// Stop streaming before the process exits.
    pub fn shutdown(&self) {
        info!("Shutting down supervisor");
        if let Err(e) = self.stop() {
            warn!("Failed to stop stream during shutdown: {}", e);
        }
    }

    fn stream_url(&self) -> String {
        format!(
            "{}/{}",
            self.inner.config.stream_url_prefix.trim_end_matches('/'),
            STREAM_MANIFEST
        )
    }

    /// Resolve a playable item, build the input list over the whole playlist
    /// and launch. The process is only installed if `generation` is still
    /// live once the launch returns.
    fn launch(&self, generation: u64, mode: LaunchMode) -> EngineResult<()> {
        let item = self.resolve_playable(mode)?;
        let (items, index) = self.inner.playlist.snapshot_with_cursor();
        let input = InputSpec::from_playlist(&items, index);
        if input.is_empty() {
            return Err(Rejection::SourceMissing.into());
        }

        let spawned = self.inner.launcher.launch(&input)?;
        let pid = spawned.process.pid();

        {
            let mut session = self.inner.session.lock();
            if !session.is_current(generation) {
                info!("Stop requested during launch, discarding encoder");
                if let Err(e) = spawned.process.terminate() {
                    warn!("Failed to kill discarded encoder: {}", e);
                }
                return Err(Rejection::Interrupted.into());
            }

            session.process = Some(spawned.process);
            session.current_source = Some(item.source_ref.clone());
            session.restart_token = None;
            if mode == LaunchMode::Restart {
                session.restarts += 1;
            }
            self.transition(&mut session, StreamPhase::Streaming);
        }

        info!(name = %item.display_name, path = %item.source_ref, "Streaming item");
        self.send_event(StreamEvent::EncoderStarted {
            pid,
            source: item.source_ref,
            inputs: input.len(),
        });

        tokio::spawn(self.clone().watch_exit(generation, spawned.exit));
        Ok(())
    }

    /// The current item if its source exists. On restart, walk forward at
    /// most one full lap looking for one that does.
    fn resolve_playable(&self, mode: LaunchMode) -> EngineResult<MediaItem> {
        let playlist = &self.inner.playlist;
        let mut item = playlist.current_item().ok_or(Rejection::EmptyPlaylist)?;

        for attempt in 0..playlist.len() {
            if attempt > 0 {
                item = playlist.advance().ok_or(Rejection::EmptyPlaylist)?;
            }
            if Path::new(&item.source_ref).exists() {
                return Ok(item);
            }

            error!(id = %item.id, path = %item.source_ref, "Source file not found");
            if mode == LaunchMode::Start {
                break;
            }
        }

        Err(Rejection::SourceMissing.into())
    }

    async fn watch_exit(self, generation: u64, exit: oneshot::Receiver<ExitCause>) {
        let cause = exit.await.unwrap_or(ExitCause::Killed);
        self.on_process_exit(generation, cause).await;
    }

    /// React to the encoder ending on its own. Exits of a stopped or
    /// replaced encoder are ignored.
    async fn on_process_exit(&self, generation: u64, cause: ExitCause) {
        let (restart_generation, token) = {
            let mut session = self.inner.session.lock();
            if session.generation != generation {
                debug!(?cause, "Ignoring exit of a replaced encoder");
                return;
            }

            session.release_process();
            warn!(cause = %cause.message(), "Encoder exited");
            self.send_event(StreamEvent::EncoderExited {
                cause: cause.clone(),
            });

            if !session.wants_playback {
                self.settle(&mut session);
                return;
            }

            let token = CancellationToken::new();
            session.cancel_restart();
            session.restart_token = Some(token.clone());
            let restart_generation = session.next_generation();
            self.transition(&mut session, StreamPhase::Starting);
            (restart_generation, token)
        };

        self.restart(restart_generation, token).await;
    }

    /// Advance, wait out the fixed delay, relaunch. Repeats while launches
    /// fail; gives up only when there is nothing playable or a stop cancels.
    async fn restart(&self, generation: u64, token: CancellationToken) {
        let policy = self.inner.config.restart_policy;
        let mut attempt = 0;

        while policy.should_retry(attempt) {
            attempt += 1;

            if self.inner.playlist.advance().is_none() {
                info!("Playlist is empty, not restarting");
                self.settle_idle(generation);
                return;
            }

            let delay = policy.delay_for_attempt(attempt);
            info!(attempt, delay_ms = delay.as_millis() as u64, "Restarting stream");
            self.send_event(StreamEvent::RestartScheduled {
                delay_ms: delay.as_millis() as u64,
            });

            tokio::select! {
                _ = token.cancelled() => {
                    info!("Pending restart cancelled");
                    return;
                }
                _ = tokio::time::sleep(delay) => {}
            }

            if token.is_cancelled() {
                return;
            }

            match self.launch(generation, LaunchMode::Restart) {
                Ok(()) => return,
                Err(EngineError::Rejected(rejection)) => {
                    warn!(reason = rejection.message(), "Restart abandoned");
                    self.settle_idle(generation);
                    return;
                }
                Err(e) => {
                    error!("Restart failed: {}", e);
                    self.send_event(StreamEvent::Error {
                        message: e.to_string(),
                    });
                }
            }
        }
    }

    /// Return to `Idle` unless `generation` has already been superseded.
    fn settle_idle(&self, generation: u64) {
        let mut session = self.inner.session.lock();
        if session.generation != generation {
            return;
        }

        session.wants_playback = false;
        session.next_generation();
        session.cancel_restart();
        if let Some(process) = session.release_process() {
            if let Err(e) = process.terminate() {
                warn!("Failed to kill encoder: {}", e);
            }
        }
        self.settle(&mut session);
    }

    /// Walk to `Idle` through `Stopping`.
    fn settle(&self, session: &mut StreamSession) {
        if session.phase.is_idle() {
            return;
        }
        if !session.phase.is_stopping() {
            self.transition(session, StreamPhase::Stopping);
        }
        self.transition(session, StreamPhase::Idle);
    }

    fn transition(&self, session: &mut StreamSession, next: StreamPhase) {
        let previous = std::mem::replace(&mut session.phase, next);

        debug!(
            previous = %previous.name(),
            current = %next.name(),
            "State transition"
        );

        self.send_event(StreamEvent::PhaseChanged {
            previous,
            current: next,
        });
    }

    fn send_event(&self, event: StreamEvent) {
        if let Err(e) = self.inner.event_tx.try_send(event) {
            warn!("Failed to send event: {}", e);
        }
    }
}
