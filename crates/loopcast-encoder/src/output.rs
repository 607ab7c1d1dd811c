//! Stream directory housekeeping.

use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::EncoderResult;

/// Create the stream directory if needed.
pub fn ensure_stream_dir(dir: &Path) -> EncoderResult<()> {
    if !dir.exists() {
        fs::create_dir_all(dir)?;
        info!(dir = %dir.display(), "Stream directory created");
    }
    Ok(())
}

/// Remove leftover manifest, segments and input lists from a previous run.
/// Returns the number of files removed.
pub fn clean_stream_dir(dir: &Path) -> EncoderResult<usize> {
    if !dir.exists() {
        return Ok(0);
    }

    let mut removed = 0;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            fs::remove_file(entry.path())?;
            removed += 1;
        }
    }

    debug!(dir = %dir.display(), removed, "Stream directory cleaned");
    Ok(removed)
}
