//! Test doubles for driving the supervisor without a real encoder.

use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;
use parking_lot::Mutex;
use tempfile::TempDir;
use tokio::sync::oneshot;

use loopcast_encoder::{
    EncoderError, EncoderLauncher, EncoderProcess, EncoderResult, InputSpec, SpawnedEncoder,
};
use loopcast_ipc::{event_channel, ExitCause, MediaItem, StreamEvent};
use loopcast_playlist::PlaylistStore;

use crate::{RestartPolicy, Supervisor, SupervisorConfig};

/// Observable state of one fake encoder.
#[derive(Default)]
pub(crate) struct FakeState {
    pub suspended: AtomicBool,
    pub terminated: AtomicBool,
}

struct FakeProcess {
    state: Arc<FakeState>,
}

impl EncoderProcess for FakeProcess {
    fn pid(&self) -> Option<u32> {
        Some(4242)
    }

    fn suspend(&self) -> EncoderResult<()> {
        self.state.suspended.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn resume(&self) -> EncoderResult<()> {
        self.state.suspended.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn terminate(&self) -> EncoderResult<()> {
        self.state.terminated.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Launcher that records inputs and lets the test end each process.
#[derive(Default)]
pub(crate) struct FakeLauncher {
    inputs: Mutex<Vec<InputSpec>>,
    exits: Mutex<Vec<Option<oneshot::Sender<ExitCause>>>>,
    states: Mutex<Vec<Arc<FakeState>>>,
    on_launch: Mutex<Option<Box<dyn FnOnce() + Send>>>,
    pub fail: AtomicBool,
}

impl EncoderLauncher for FakeLauncher {
    fn launch(&self, input: &InputSpec) -> EncoderResult<SpawnedEncoder> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(EncoderError::Spawn {
                program: "fake".to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no encoder"),
            });
        }

        let (exit_tx, exit_rx) = oneshot::channel();
        let state = Arc::new(FakeState::default());

        self.inputs.lock().push(input.clone());
        self.exits.lock().push(Some(exit_tx));
        self.states.lock().push(Arc::clone(&state));

        let hook = self.on_launch.lock().take();
        if let Some(hook) = hook {
            hook();
        }

        Ok(SpawnedEncoder {
            process: Box::new(FakeProcess { state }),
            exit: exit_rx,
        })
    }
}

impl FakeLauncher {
    pub fn launch_count(&self) -> usize {
        self.inputs.lock().len()
    }

    pub fn last_input(&self) -> InputSpec {
        self.inputs.lock().last().cloned().expect("no launch recorded")
    }

    pub fn last_state(&self) -> Arc<FakeState> {
        self.states.lock().last().cloned().expect("no launch recorded")
    }

    pub fn state(&self, index: usize) -> Arc<FakeState> {
        self.states.lock()[index].clone()
    }

    /// Run `hook` inside the next launch, after the process exists but
    /// before the launcher returns it.
    pub fn on_next_launch(&self, hook: impl FnOnce() + Send + 'static) {
        *self.on_launch.lock() = Some(Box::new(hook));
    }

    /// End the most recent process as if it exited by itself.
    pub fn exit_last(&self, cause: ExitCause) {
        let sender = self
            .exits
            .lock()
            .last_mut()
            .and_then(Option::take)
            .expect("no live process to exit");
        let _ = sender.send(cause);
    }
}

/// A supervisor wired to a temp playlist and a fake launcher.
pub(crate) struct Harness {
    dir: TempDir,
    pub playlist: Arc<PlaylistStore>,
    pub launcher: Arc<FakeLauncher>,
    pub supervisor: Supervisor,
    pub events: Receiver<StreamEvent>,
}

impl Harness {
    pub fn new(restart_delay: Duration) -> Self {
        Self::build(tempfile::tempdir().unwrap(), restart_delay)
    }

    /// Like `new`, but the store is opened over a snapshot already holding
    /// `count` items whose media files do not exist.
    pub fn with_snapshot(restart_delay: Duration, count: usize) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let items: Vec<_> = (0..count)
            .map(|i| {
                let path = dir.path().join(format!("bulk-{i}.mp4"));
                MediaItem::new(path.to_string_lossy(), format!("bulk-{i}.mp4"), 5, None)
            })
            .collect();
        fs::write(
            dir.path().join("playlist.json"),
            serde_json::to_vec(&items).unwrap(),
        )
        .unwrap();

        Self::build(dir, restart_delay)
    }

    fn build(dir: TempDir, restart_delay: Duration) -> Self {
        let playlist = Arc::new(PlaylistStore::open(dir.path().join("playlist.json")).unwrap());
        let launcher = Arc::new(FakeLauncher::default());
        let (event_tx, events) = event_channel();

        let supervisor = Supervisor::new(
            Arc::clone(&playlist),
            launcher.clone(),
            SupervisorConfig {
                restart_policy: RestartPolicy::fixed(restart_delay),
                ..Default::default()
            },
            event_tx,
        );

        Self {
            dir,
            playlist,
            launcher,
            supervisor,
            events,
        }
    }

    pub fn media_path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Add an item whose media file exists.
    pub fn add_media(&self, name: &str) -> MediaItem {
        let path = self.media_path(name);
        fs::write(&path, b"media").unwrap();
        self.playlist
            .add(path.to_string_lossy(), name, 5, None)
            .unwrap()
    }

    /// Add an item whose media file does not exist.
    pub fn add_missing(&self, name: &str) -> MediaItem {
        let path = self.media_path(name);
        self.playlist
            .add(path.to_string_lossy(), name, 5, None)
            .unwrap()
    }
}

/// Poll `condition` until it holds, failing the test after a few seconds.
pub(crate) async fn wait_for(mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(Instant::now() < deadline, "condition not reached in time");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
