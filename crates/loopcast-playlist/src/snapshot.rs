//! On-disk snapshot format.

use std::fs;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use loopcast_ipc::MediaItem;

use crate::{PlaylistError, PlaylistResult};

/// Current snapshot schema version.
pub(crate) const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Serialize)]
struct SnapshotRef<'a> {
    version: u32,
    items: &'a [MediaItem],
}

/// Accepted snapshot layouts: the versioned record, or a bare item array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SnapshotFile {
    Versioned {
        #[serde(default)]
        items: Vec<MediaItem>,
    },
    Bare(Vec<MediaItem>),
}

/// Load the playlist, falling back to an empty list on any read or parse failure.
pub(crate) fn load(path: &Path) -> Vec<MediaItem> {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
        Err(e) => {
            warn!(path = %path.display(), "Failed to read playlist: {}", e);
            return Vec::new();
        }
    };

    match serde_json::from_slice::<SnapshotFile>(&data) {
        Ok(SnapshotFile::Versioned { items }) | Ok(SnapshotFile::Bare(items)) => {
            debug!(count = items.len(), "Playlist loaded");
            items
        }
        Err(e) => {
            warn!(path = %path.display(), "Failed to parse playlist: {}", e);
            Vec::new()
        }
    }
}

/// Write the playlist atomically: temp file in the same directory, then rename.
pub(crate) fn save(path: &Path, items: &[MediaItem]) -> PlaylistResult<()> {
    let data = serde_json::to_vec_pretty(&SnapshotRef {
        version: SNAPSHOT_VERSION,
        items,
    })?;

    let tmp = path.with_extension("json.tmp");
    let write = || -> std::io::Result<()> {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(&data)?;
        file.sync_all()?;
        fs::rename(&tmp, path)
    };

    write().map_err(|source| PlaylistError::Write {
        path: path.to_path_buf(),
        source,
    })
}
