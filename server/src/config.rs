//! Command-line and environment configuration.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use loopcast_encoder::EncoderConfig;
use loopcast_engine::{RestartPolicy, SupervisorConfig};
use loopcast_playlist::SNAPSHOT_FILE;

/// Continuous HLS live-streaming server.
#[derive(Parser, Debug, Clone)]
#[command(name = "loopcast")]
#[command(version)]
pub struct Config {
    /// Port to listen on
    #[arg(short, long, default_value_t = 3000, env = "PORT")]
    pub port: u16,

    /// Directory holding uploaded media and the playlist snapshot
    #[arg(long, default_value = "uploads", env = "UPLOAD_DIR")]
    pub upload_dir: PathBuf,

    /// Directory the encoder writes the manifest and segments into
    #[arg(long, default_value = "stream", env = "STREAM_DIR")]
    pub stream_dir: PathBuf,

    /// Target segment duration in seconds
    #[arg(long, default_value_t = 2, env = "HLS_SEGMENT_DURATION")]
    pub hls_segment_duration: u32,

    /// Number of segments kept in the rolling manifest
    #[arg(long, default_value_t = 10, env = "HLS_LIST_SIZE")]
    pub hls_list_size: u32,

    /// Maximum upload size in megabytes
    #[arg(long, default_value_t = 500, env = "MAX_UPLOAD_SIZE")]
    pub max_upload_size: u64,

    /// Delay before relaunching a crashed encoder, in milliseconds
    #[arg(long, default_value_t = loopcast_engine::DEFAULT_RESTART_DELAY_MS, env = "RESTART_DELAY_MS")]
    pub restart_delay_ms: u64,

    /// Encoder binary
    #[arg(long, default_value = "ffmpeg", env = "FFMPEG_PATH")]
    pub ffmpeg: PathBuf,

    /// Probe binary used for media durations
    #[arg(long, default_value = "ffprobe", env = "FFPROBE_PATH")]
    pub ffprobe: PathBuf,
}

impl Config {
    /// Location of the playlist snapshot.
    pub fn snapshot_path(&self) -> PathBuf {
        self.upload_dir.join(SNAPSHOT_FILE)
    }

    /// Upload limit in bytes.
    pub fn max_upload_bytes(&self) -> usize {
        usize::try_from(self.max_upload_size.saturating_mul(1024 * 1024)).unwrap_or(usize::MAX)
    }

    /// Encoder launch settings.
    pub fn encoder_config(&self) -> EncoderConfig {
        EncoderConfig {
            ffmpeg_path: self.ffmpeg.clone(),
            stream_dir: self.stream_dir.clone(),
            segment_duration_secs: self.hls_segment_duration,
            hls_list_size: self.hls_list_size,
            ..Default::default()
        }
    }

    /// Supervisor settings.
    pub fn supervisor_config(&self) -> SupervisorConfig {
        SupervisorConfig {
            restart_policy: RestartPolicy::fixed(Duration::from_millis(self.restart_delay_ms)),
            ..Default::default()
        }
    }
}
