//! Encoder input list.

use std::path::{Path, PathBuf};

use tracing::warn;

use loopcast_ipc::MediaItem;

/// Ordered list of sources the encoder reads back-to-back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputSpec {
    sources: Vec<PathBuf>,
}

impl InputSpec {
    /// Build from explicit paths, in order.
    pub fn new(sources: Vec<PathBuf>) -> Self {
        Self { sources }
    }

    /// Build from the whole playlist, starting at `start` and wrapping, so a
    /// looping encoder plays every item without a relaunch. Sources missing on
    /// disk are skipped.
    pub fn from_playlist(items: &[MediaItem], start: usize) -> Self {
        if items.is_empty() {
            return Self::default();
        }

        let start = start % items.len();
        let sources = items[start..]
            .iter()
            .chain(&items[..start])
            .filter_map(|item| {
                let path = Path::new(&item.source_ref);
                if path.exists() {
                    Some(path.to_path_buf())
                } else {
                    warn!(id = %item.id, path = %item.source_ref, "Skipping missing source");
                    None
                }
            })
            .collect();

        Self { sources }
    }

    /// Sources in playback order.
    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    /// First source the encoder will read.
    pub fn first(&self) -> Option<&Path> {
        self.sources.first().map(PathBuf::as_path)
    }

    /// Number of sources.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Returns true if there is nothing to play.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Render as an ffmpeg concat demuxer list.
    pub fn to_concat(&self) -> String {
        let mut out = String::new();
        for source in &self.sources {
            let escaped = source.to_string_lossy().replace('\'', r"'\''");
            out.push_str("file '");
            out.push_str(&escaped);
            out.push_str("'\n");
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn item_at(dir: &Path, name: &str, create: bool) -> MediaItem {
        let path = dir.join(name);
        if create {
            fs::write(&path, b"media").unwrap();
        }
        MediaItem::new(path.to_string_lossy(), name, 5, None)
    }

    #[test]
    fn test_from_playlist_rotates_to_start() {
        let dir = tempfile::tempdir().unwrap();
        let items: Vec<_> = ["a.mp4", "b.mp4", "c.mp4"]
            .iter()
            .map(|name| item_at(dir.path(), name, true))
            .collect();

        let spec = InputSpec::from_playlist(&items, 1);

        let names: Vec<_> = spec
            .sources()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["b.mp4", "c.mp4", "a.mp4"]);
        assert_eq!(spec.first(), Some(dir.path().join("b.mp4").as_path()));
    }

    #[test]
    fn test_from_playlist_skips_missing_sources() {
        let dir = tempfile::tempdir().unwrap();
        let items = vec![
            item_at(dir.path(), "a.mp4", true),
            item_at(dir.path(), "gone.mp4", false),
            item_at(dir.path(), "c.mp4", true),
        ];

        let spec = InputSpec::from_playlist(&items, 1);

        assert_eq!(spec.len(), 2);
        assert_eq!(spec.first(), Some(dir.path().join("c.mp4").as_path()));
    }

    #[test]
    fn test_from_empty_playlist() {
        assert!(InputSpec::from_playlist(&[], 3).is_empty());
    }

    #[test]
    fn test_concat_escapes_quotes() {
        let spec = InputSpec::new(vec![
            PathBuf::from("/media/plain.mp4"),
            PathBuf::from("/media/it's.mp4"),
        ]);

        assert_eq!(
            spec.to_concat(),
            "file '/media/plain.mp4'\nfile '/media/it'\\''s.mp4'\n"
        );
    }
}
