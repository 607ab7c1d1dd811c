//! External encoder control.
//!
//! The encoder is an opaque ffmpeg process that reads a concat list of
//! sources at native rate, loops it forever, and writes a rolling HLS
//! manifest plus segments into the stream directory. This crate builds that
//! input list, launches the process, and exposes it through the
//! [`EncoderProcess`] capability so the supervisor never touches OS details.

mod error;
mod ffmpeg;
mod input;
mod output;
mod probe;

pub use error::EncoderError;
pub use ffmpeg::{FfmpegLauncher, FfmpegProcess};
pub use input::InputSpec;
pub use output::{clean_stream_dir, ensure_stream_dir};
pub use probe::{parse_probe_output, probe_duration};

use std::path::PathBuf;

use loopcast_ipc::ExitCause;
use tokio::sync::oneshot;

/// Result type for encoder operations.
pub type EncoderResult<T> = Result<T, EncoderError>;

/// Name of the concat list written next to the segments.
pub const CONCAT_FILE: &str = "concat.txt";

/// Segment file name pattern handed to the encoder.
pub const SEGMENT_PATTERN: &str = "segment_%03d.ts";

/// Encoder launch configuration.
#[derive(Debug, Clone)]
pub struct EncoderConfig {
    /// Encoder binary.
    pub ffmpeg_path: PathBuf,

    /// Directory receiving the manifest, segments and concat list.
    pub stream_dir: PathBuf,

    /// Target segment length in seconds.
    pub segment_duration_secs: u32,

    /// Number of segments kept in the rolling manifest.
    pub hls_list_size: u32,

    /// x264 preset.
    pub video_preset: String,

    /// AAC bitrate in kbps.
    pub audio_bitrate_kbps: u32,

    /// Output audio sample rate in Hz.
    pub audio_sample_rate: u32,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            stream_dir: PathBuf::from("stream"),
            segment_duration_secs: 2,
            hls_list_size: 10,
            video_preset: "veryfast".to_string(),
            audio_bitrate_kbps: 128,
            audio_sample_rate: 44100,
        }
    }
}

/// Control surface over a running encoder.
///
/// Implementations decide how suspension works on their platform (job
/// control signals, a cooperative flag, ...). `terminate` is forceful and
/// idempotent.
pub trait EncoderProcess: Send + Sync {
    /// OS process id, when there is one.
    fn pid(&self) -> Option<u32>;

    /// Freeze the process, keeping its state.
    fn suspend(&self) -> EncoderResult<()>;

    /// Continue a suspended process.
    fn resume(&self) -> EncoderResult<()>;

    /// Kill the process without draining.
    fn terminate(&self) -> EncoderResult<()>;
}

/// A freshly launched encoder and its termination notification.
pub struct SpawnedEncoder {
    /// Process controls.
    pub process: Box<dyn EncoderProcess>,

    /// Resolves once the process is gone. A dropped sender counts as killed.
    pub exit: oneshot::Receiver<ExitCause>,
}

/// Starts encoder processes.
pub trait EncoderLauncher: Send + Sync {
    /// Launch an encoder over `input`. Returns once the process is spawned.
    fn launch(&self, input: &InputSpec) -> EncoderResult<SpawnedEncoder>;

    /// Directory the encoder writes into.
    fn stream_dir(&self) -> Option<&std::path::Path> {
        None
    }
}
