//! Error types for the encoder module.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while controlling the encoder process.
#[derive(Debug, Error)]
pub enum EncoderError {
    /// The input list has no playable source.
    #[error("No playable sources in input list")]
    EmptyInput,

    /// Writing the concat input file failed.
    #[error("Failed to write input list {path}: {source}")]
    InputList {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The encoder binary could not be started.
    #[error("Failed to spawn encoder {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Delivering a control signal to the process failed.
    #[error("Failed to signal encoder process {pid}: {source}")]
    Signal {
        pid: u32,
        #[source]
        source: std::io::Error,
    },

    /// The process has already exited or was never assigned a pid.
    #[error("Encoder process is not running")]
    NotRunning,

    /// Suspend/resume is not available on this platform.
    #[error("Operation not supported on this platform: {0}")]
    Unsupported(&'static str),

    /// Stream directory housekeeping failed.
    #[error("Stream directory error: {0}")]
    StreamDir(#[from] std::io::Error),
}
