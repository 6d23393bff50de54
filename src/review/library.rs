// SPDX-License-Identifier: GPL-3.0-only

//! Library writers for saved photos and videos

use crate::constants::{FILE_TIMESTAMP_FORMAT, PHOTO_EXTENSION, PHOTO_PREFIX, VIDEO_PREFIX};
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;

/// Destination for media the user chose to keep
///
/// Calls block; the review stage runs them on a blocking worker.
pub trait PhotoLibrary: Send + Sync {
    /// Store encoded still bytes, returning where they ended up
    fn save_photo(&self, bytes: &[u8]) -> io::Result<PathBuf>;

    /// Store a copy of a finished movie file
    fn save_video(&self, source: &Path) -> io::Result<PathBuf>;
}

/// Library backed by a plain directory
#[derive(Debug, Clone)]
pub struct DirectoryLibrary {
    root: PathBuf,
}

impl DirectoryLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<PREFIX>_<timestamp>_<id>.<ext>`
    ///
    /// The short id keeps two saves within the same second apart.
    fn file_name(prefix: &str, extension: &str) -> String {
        let timestamp = chrono::Local::now().format(FILE_TIMESTAMP_FORMAT);
        let id = uuid::Uuid::new_v4().simple().to_string();
        format!("{}_{}_{}.{}", prefix, timestamp, &id[..8], extension)
    }
}

impl PhotoLibrary for DirectoryLibrary {
    fn save_photo(&self, bytes: &[u8]) -> io::Result<PathBuf> {
        std::fs::create_dir_all(&self.root)?;
        let path = self
            .root
            .join(Self::file_name(PHOTO_PREFIX, PHOTO_EXTENSION));
        std::fs::write(&path, bytes)?;
        info!(path = %path.display(), bytes = bytes.len(), "Photo saved to library");
        Ok(path)
    }

    fn save_video(&self, source: &Path) -> io::Result<PathBuf> {
        std::fs::create_dir_all(&self.root)?;
        let extension = source
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("mov");
        let path = self.root.join(Self::file_name(VIDEO_PREFIX, extension));
        std::fs::copy(source, &path)?;
        info!(path = %path.display(), "Video saved to library");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_photo_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let library = DirectoryLibrary::new(dir.path().join("nested").join("library"));

        let path = library.save_photo(&[0xff, 0xd8, 0xff]).unwrap();
        assert!(path.starts_with(library.root()));
        assert_eq!(std::fs::read(&path).unwrap(), vec![0xff, 0xd8, 0xff]);

        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("IMG_"));
        assert!(name.ends_with(".jpg"));
    }

    #[test]
    fn test_save_video_keeps_extension() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("capture.mov");
        std::fs::write(&source, b"SIMMOV01moov").unwrap();
        let library = DirectoryLibrary::new(dir.path().join("library"));

        let path = library.save_video(&source).unwrap();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("VID_"));
        assert!(name.ends_with(".mov"));
        assert_eq!(std::fs::read(&path).unwrap(), b"SIMMOV01moov");
        assert!(source.exists());
    }

    #[test]
    fn test_saves_in_same_second_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let library = DirectoryLibrary::new(dir.path());
        let first = library.save_photo(b"a").unwrap();
        let second = library.save_photo(b"b").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_missing_source_video_fails() {
        let dir = tempfile::tempdir().unwrap();
        let library = DirectoryLibrary::new(dir.path());
        assert!(library.save_video(&dir.path().join("gone.mov")).is_err());
    }
}
