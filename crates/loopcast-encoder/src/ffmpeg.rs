//! ffmpeg-backed encoder process.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::oneshot;
use tracing::{debug, info, instrument, warn};

use loopcast_ipc::{ExitCause, STREAM_MANIFEST};

use crate::{
    EncoderConfig, EncoderError, EncoderLauncher, EncoderProcess, EncoderResult, InputSpec,
    SpawnedEncoder, CONCAT_FILE, SEGMENT_PATTERN,
};

/// Launches ffmpeg as a looping HLS encoder.
pub struct FfmpegLauncher {
    config: EncoderConfig,
}

impl FfmpegLauncher {
    /// Create a launcher.
    pub fn new(config: EncoderConfig) -> Self {
        Self { config }
    }

    /// Full argument list for an input list stored at `concat_path`.
    pub fn command_args(&self, concat_path: &Path) -> Vec<String> {
        let config = &self.config;
        let dir = &config.stream_dir;

        let mut args: Vec<String> = [
            "-hide_banner",
            "-nostdin",
            "-f",
            "concat",
            "-safe",
            "0",
            "-stream_loop",
            "-1",
            "-re",
            "-i",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        args.push(concat_path.to_string_lossy().into_owned());
        args.extend([
            "-c:v".to_string(),
            "libx264".to_string(),
            "-preset".to_string(),
            config.video_preset.clone(),
            "-tune".to_string(),
            "zerolatency".to_string(),
            "-c:a".to_string(),
            "aac".to_string(),
            "-b:a".to_string(),
            format!("{}k", config.audio_bitrate_kbps),
            "-ar".to_string(),
            config.audio_sample_rate.to_string(),
            "-f".to_string(),
            "hls".to_string(),
            "-hls_time".to_string(),
            config.segment_duration_secs.to_string(),
            "-hls_list_size".to_string(),
            config.hls_list_size.to_string(),
            "-hls_flags".to_string(),
            "delete_segments+append_list".to_string(),
            "-hls_segment_filename".to_string(),
            dir.join(SEGMENT_PATTERN).to_string_lossy().into_owned(),
            dir.join(STREAM_MANIFEST).to_string_lossy().into_owned(),
        ]);

        args
    }

    fn write_input_list(&self, input: &InputSpec) -> EncoderResult<PathBuf> {
        let path = self.config.stream_dir.join(CONCAT_FILE);
        fs::create_dir_all(&self.config.stream_dir)
            .and_then(|()| fs::write(&path, input.to_concat()))
            .map_err(|source| EncoderError::InputList {
                path: path.clone(),
                source,
            })?;
        Ok(path)
    }
}

impl EncoderLauncher for FfmpegLauncher {
    #[instrument(name = "launch_encoder", skip(self, input), fields(inputs = input.len()))]
    fn launch(&self, input: &InputSpec) -> EncoderResult<SpawnedEncoder> {
        if input.is_empty() {
            return Err(EncoderError::EmptyInput);
        }

        let concat_path = self.write_input_list(input)?;
        let args = self.command_args(&concat_path);
        let program = self.config.ffmpeg_path.to_string_lossy().into_owned();

        info!(command = %format!("{} {}", program, args.join(" ")), "Starting encoder");

        let mut child = Command::new(&self.config.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| EncoderError::Spawn {
                program: program.clone(),
                source,
            })?;

        let pid = child.id();
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(target: "loopcast_encoder::ffmpeg", "{}", line);
                }
            });
        }

        let (kill_tx, kill_rx) = oneshot::channel();
        let (exit_tx, exit_rx) = oneshot::channel();
        let exited = Arc::new(AtomicBool::new(false));
        tokio::spawn(watch_child(child, kill_rx, exit_tx, Arc::clone(&exited)));

        info!(?pid, "Encoder process started");

        Ok(SpawnedEncoder {
            process: Box::new(FfmpegProcess {
                pid,
                kill_tx: Mutex::new(Some(kill_tx)),
                exited,
            }),
            exit: exit_rx,
        })
    }

    fn stream_dir(&self) -> Option<&Path> {
        Some(&self.config.stream_dir)
    }
}

/// Waits for the child to exit, or kills it when asked (or when the control
/// handle is dropped), then reports how it ended. `exited` is raised as soon
/// as the pid has been reaped.
async fn watch_child(
    mut child: Child,
    kill_rx: oneshot::Receiver<()>,
    exit_tx: oneshot::Sender<ExitCause>,
    exited: Arc<AtomicBool>,
) {
    let cause = tokio::select! {
        status = child.wait() => match status {
            Ok(status) => exit_cause(status),
            Err(e) => {
                warn!("Failed to wait for encoder: {}", e);
                ExitCause::Failed { code: None }
            }
        },
        _ = kill_rx => {
            if let Err(e) = child.start_kill() {
                warn!("Failed to kill encoder: {}", e);
            }
            let _ = child.wait().await;
            ExitCause::Killed
        }
    };

    exited.store(true, Ordering::SeqCst);
    debug!(?cause, "Encoder process exited");
    let _ = exit_tx.send(cause);
}

fn exit_cause(status: ExitStatus) -> ExitCause {
    if status.success() {
        ExitCause::Completed
    } else {
        match status.code() {
            Some(code) => ExitCause::Failed { code: Some(code) },
            None => ExitCause::Killed,
        }
    }
}

/// Handle on a running ffmpeg process.
pub struct FfmpegProcess {
    pid: Option<u32>,
    kill_tx: Mutex<Option<oneshot::Sender<()>>>,
    #[cfg_attr(not(unix), allow(dead_code))]
    exited: Arc<AtomicBool>,
}

impl FfmpegProcess {
    #[cfg(unix)]
    fn signal(&self, signal: libc::c_int) -> EncoderResult<()> {
        // A reaped pid may already belong to another process.
        if self.kill_tx.lock().is_none() || self.exited.load(Ordering::SeqCst) {
            return Err(EncoderError::NotRunning);
        }
        let pid = self.pid.ok_or(EncoderError::NotRunning)?;

        // SAFETY: kill(2) has no memory-safety preconditions.
        let rc = unsafe { libc::kill(pid as libc::pid_t, signal) };
        if rc == 0 {
            Ok(())
        } else {
            Err(EncoderError::Signal {
                pid,
                source: std::io::Error::last_os_error(),
            })
        }
    }
}

impl EncoderProcess for FfmpegProcess {
    fn pid(&self) -> Option<u32> {
        self.pid
    }

    #[cfg(unix)]
    fn suspend(&self) -> EncoderResult<()> {
        self.signal(libc::SIGSTOP)
    }

    #[cfg(not(unix))]
    fn suspend(&self) -> EncoderResult<()> {
        Err(EncoderError::Unsupported("suspend"))
    }

    #[cfg(unix)]
    fn resume(&self) -> EncoderResult<()> {
        self.signal(libc::SIGCONT)
    }

    #[cfg(not(unix))]
    fn resume(&self) -> EncoderResult<()> {
        Err(EncoderError::Unsupported("resume"))
    }

    fn terminate(&self) -> EncoderResult<()> {
        if let Some(kill_tx) = self.kill_tx.lock().take() {
            let _ = kill_tx.send(());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn launcher(dir: &Path, program: &str) -> FfmpegLauncher {
        FfmpegLauncher::new(EncoderConfig {
            ffmpeg_path: PathBuf::from(program),
            stream_dir: dir.to_path_buf(),
            ..Default::default()
        })
    }

    fn one_source(dir: &Path) -> InputSpec {
        let source = dir.join("a.mp4");
        fs::write(&source, b"media").unwrap();
        InputSpec::new(vec![source])
    }

    #[test]
    fn test_command_args_describe_looping_hls() {
        let launcher = launcher(Path::new("/srv/stream"), "ffmpeg");
        let args = launcher.command_args(Path::new("/srv/stream/concat.txt"));
        let joined = args.join(" ");

        assert!(joined.contains("-f concat -safe 0 -stream_loop -1 -re -i /srv/stream/concat.txt"));
        assert!(joined.contains("-hls_time 2"));
        assert!(joined.contains("-hls_list_size 10"));
        assert!(joined.contains("-hls_flags delete_segments+append_list"));
        assert!(joined.contains("-hls_segment_filename /srv/stream/segment_%03d.ts"));
        assert_eq!(args.last().unwrap(), "/srv/stream/stream.m3u8");
    }

    #[tokio::test]
    async fn test_launch_rejects_empty_input() {
        let dir = tempfile::tempdir().unwrap();
        let result = launcher(dir.path(), "ffmpeg").launch(&InputSpec::default());
        assert!(matches!(result, Err(EncoderError::EmptyInput)));
    }

    #[tokio::test]
    async fn test_launch_missing_binary() {
        let dir = tempfile::tempdir().unwrap();
        let input = one_source(dir.path());

        let result = launcher(dir.path(), "/nonexistent/ffmpeg-binary").launch(&input);

        assert!(matches!(result, Err(EncoderError::Spawn { .. })));
        assert!(dir.path().join(CONCAT_FILE).exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exit_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let input = one_source(dir.path());

        let spawned = launcher(dir.path(), "false").launch(&input).unwrap();
        let cause = tokio::time::timeout(Duration::from_secs(5), spawned.exit)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(cause, ExitCause::Failed { code: Some(1) });
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_signals_refused_after_natural_exit() {
        let dir = tempfile::tempdir().unwrap();
        let input = one_source(dir.path());

        let spawned = launcher(dir.path(), "true").launch(&input).unwrap();
        let cause = tokio::time::timeout(Duration::from_secs(5), spawned.exit)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cause, ExitCause::Completed);

        assert!(matches!(
            spawned.process.suspend(),
            Err(EncoderError::NotRunning)
        ));
        assert!(matches!(
            spawned.process.resume(),
            Err(EncoderError::NotRunning)
        ));
        spawned.process.terminate().unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_suspend_resume_terminate() {
        let dir = tempfile::tempdir().unwrap();
        let input = one_source(dir.path());

        // `yes` ignores the arguments' meaning and runs until killed.
        let spawned = launcher(dir.path(), "yes").launch(&input).unwrap();
        assert!(spawned.process.pid().is_some());

        spawned.process.suspend().unwrap();
        spawned.process.resume().unwrap();
        spawned.process.terminate().unwrap();
        spawned.process.terminate().unwrap();

        let cause = tokio::time::timeout(Duration::from_secs(5), spawned.exit)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cause, ExitCause::Killed);
        assert!(matches!(
            spawned.process.suspend(),
            Err(EncoderError::NotRunning)
        ));
    }
}
