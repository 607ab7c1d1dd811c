//! Best-effort media duration probing.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, warn};

/// Ask ffprobe for the container duration of `source`.
///
/// Any failure (missing binary, unreadable media, timeout, unparsable
/// output) yields `None`; callers treat the duration as optional.
pub async fn probe_duration(ffprobe: &Path, source: &Path, timeout: Duration) -> Option<f64> {
    let output = Command::new(ffprobe)
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(source)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output();

    let output = match tokio::time::timeout(timeout, output).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            warn!(path = %source.display(), "Could not run ffprobe: {}", e);
            return None;
        }
        Err(_) => {
            warn!(path = %source.display(), "ffprobe timed out");
            return None;
        }
    };

    if !output.status.success() {
        warn!(path = %source.display(), status = ?output.status, "Could not get media duration");
        return None;
    }

    let duration = parse_probe_output(&String::from_utf8_lossy(&output.stdout));
    debug!(path = %source.display(), ?duration, "Probed duration");
    duration
}

/// Parse ffprobe's bare `format=duration` output.
pub fn parse_probe_output(stdout: &str) -> Option<f64> {
    stdout
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .and_then(|line| line.parse::<f64>().ok())
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
}
