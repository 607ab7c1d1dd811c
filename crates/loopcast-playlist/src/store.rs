//! Playlist store with a serialized read-modify-write cycle.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use loopcast_ipc::{MediaItem, PlaylistStatus};

use crate::snapshot;
use crate::{PlaylistError, PlaylistResult};

struct Inner {
    items: Vec<MediaItem>,
    current_index: usize,
}

impl Inner {
    fn clamp_index(&mut self) {
        if self.items.is_empty() {
            self.current_index = 0;
        } else if self.current_index >= self.items.len() {
            self.current_index = self.items.len() - 1;
        }
    }

    fn current(&self) -> Option<&MediaItem> {
        self.items.get(self.current_index)
    }
}

/// Ordered collection of media items persisted as a single JSON snapshot.
///
/// Every mutation holds the store lock for the whole in-memory update plus
/// snapshot write, so overlapping calls never interleave. The current index
/// is process-local and starts at 0.
pub struct PlaylistStore {
    path: PathBuf,
    inner: Mutex<Inner>,
}

impl PlaylistStore {
    /// Open the store at `path`, creating the directory and an empty snapshot
    /// when missing. An unreadable snapshot yields an empty playlist.
    pub fn open(path: impl AsRef<Path>) -> PlaylistResult<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|source| PlaylistError::Directory {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        let items = if path.exists() {
            snapshot::load(&path)
        } else {
            snapshot::save(&path, &[])?;
            Vec::new()
        };

        info!(path = %path.display(), count = items.len(), "Playlist opened");

        Ok(Self {
            path,
            inner: Mutex::new(Inner {
                items,
                current_index: 0,
            }),
        })
    }

    /// Location of the snapshot file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a new item and persist. The in-memory playlist keeps the item
    /// even if the write fails.
    pub fn add(
        &self,
        source_ref: impl Into<String>,
        display_name: impl Into<String>,
        size_bytes: u64,
        duration_seconds: Option<f64>,
    ) -> PlaylistResult<MediaItem> {
        let item = MediaItem::new(source_ref, display_name, size_bytes, duration_seconds);

        let mut inner = self.inner.lock();
        inner.items.push(item.clone());
        self.persist(&inner)?;

        info!(id = %item.id, name = %item.display_name, "Item added to playlist");
        Ok(item)
    }

    /// Remove an item by id. Returns whether it was present.
    pub fn remove(&self, id: Uuid) -> PlaylistResult<bool> {
        let mut inner = self.inner.lock();

        let Some(position) = inner.items.iter().position(|item| item.id == id) else {
            return Ok(false);
        };

        inner.items.remove(position);
        if position <= inner.current_index {
            inner.clamp_index();
        }
        self.persist(&inner)?;

        info!(%id, current_index = inner.current_index, "Item removed from playlist");
        Ok(true)
    }

    /// Replace the order with `order`, which must be an exact permutation of
    /// the existing ids. The current index stays a raw position.
    pub fn reorder(&self, order: &[Uuid]) -> PlaylistResult<bool> {
        let mut inner = self.inner.lock();

        if order.len() != inner.items.len() {
            debug!(
                expected = inner.items.len(),
                got = order.len(),
                "Reorder rejected: length mismatch"
            );
            return Ok(false);
        }

        let unique: HashSet<&Uuid> = order.iter().collect();
        if unique.len() != order.len() {
            debug!("Reorder rejected: duplicate ids");
            return Ok(false);
        }

        let mut by_id: HashMap<Uuid, MediaItem> = inner
            .items
            .iter()
            .map(|item| (item.id, item.clone()))
            .collect();

        let mut reordered = Vec::with_capacity(order.len());
        for id in order {
            match by_id.remove(id) {
                Some(item) => reordered.push(item),
                None => {
                    debug!(%id, "Reorder rejected: unknown id");
                    return Ok(false);
                }
            }
        }

        inner.items = reordered;
        self.persist(&inner)?;

        info!("Playlist reordered");
        Ok(true)
    }

    /// Remove every item and reset the cursor.
    pub fn clear(&self) -> PlaylistResult<()> {
        let mut inner = self.inner.lock();
        inner.items.clear();
        inner.current_index = 0;
        self.persist(&inner)?;

        info!("Playlist cleared");
        Ok(())
    }

    /// Move the cursor. Fails unless `index < len`.
    pub fn set_current_index(&self, index: usize) -> bool {
        let mut inner = self.inner.lock();
        if index < inner.items.len() {
            inner.current_index = index;
            info!(index, "Current index set");
            true
        } else {
            false
        }
    }

    /// Current cursor position.
    pub fn current_index(&self) -> usize {
        self.inner.lock().current_index
    }

    /// Item at the cursor, resolved against the live playlist.
    pub fn current_item(&self) -> Option<MediaItem> {
        self.inner.lock().current().cloned()
    }

    /// Step the cursor forward, wrapping to the start.
    pub fn advance(&self) -> Option<MediaItem> {
        let mut inner = self.inner.lock();
        if inner.items.is_empty() {
            return None;
        }

        inner.current_index = (inner.current_index + 1) % inner.items.len();
        info!(index = inner.current_index, "Moving to next item");
        inner.current().cloned()
    }

    /// Items in playback order.
    pub fn snapshot(&self) -> Vec<MediaItem> {
        self.inner.lock().items.clone()
    }

    /// Items plus the cursor, read under one lock.
    pub fn snapshot_with_cursor(&self) -> (Vec<MediaItem>, usize) {
        let inner = self.inner.lock();
        (inner.items.clone(), inner.current_index)
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.inner.lock().items.len()
    }

    /// Returns true if the playlist has no items.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().items.is_empty()
    }

    /// Status view for reporting; `is_playing` comes from the supervisor.
    pub fn status(&self, is_playing: bool) -> PlaylistStatus {
        let inner = self.inner.lock();
        PlaylistStatus {
            is_playing,
            current_index: inner.current_index,
            total_items: inner.items.len(),
            current_item: inner.current().map(MediaItem::summary),
            items: inner.items.iter().map(MediaItem::summary).collect(),
        }
    }

    fn persist(&self, inner: &Inner) -> PlaylistResult<()> {
        snapshot::save(&self.path, &inner.items).inspect_err(|e| {
            warn!("Failed to save playlist: {}", e);
        })?;
        debug!(count = inner.items.len(), "Playlist saved");
        Ok(())
    }
}
