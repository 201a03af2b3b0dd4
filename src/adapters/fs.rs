//! `std::fs` backed [`FilePort`].
//!
//! On ESP-IDF the same code runs against the VFS-mounted flash partition;
//! on the host it writes under the working directory.  Paths are relative
//! to `root`.

use std::fs;
use std::path::{Path, PathBuf};

use log::warn;

use crate::app::ports::{FilePort, StorageError};

pub struct StdFs {
    root: PathBuf,
}

impl StdFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }

    fn ensure_parent(path: &Path) -> Result<(), StorageError> {
        match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => fs::create_dir_all(dir).map_err(map_io),
            _ => Ok(()),
        }
    }
}

fn map_io(e: std::io::Error) -> StorageError {
    match e.kind() {
        std::io::ErrorKind::NotFound => StorageError::NotFound,
        std::io::ErrorKind::StorageFull => StorageError::Full,
        _ => StorageError::IoError,
    }
}

impl FilePort for StdFs {
    fn read(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        fs::read(self.resolve(path)).map_err(map_io)
    }

    fn write(&mut self, path: &str, data: &[u8]) -> Result<(), StorageError> {
        let target = self.resolve(path);
        Self::ensure_parent(&target)?;
        fs::write(&target, data).map_err(|e| {
            warn!("FS: write {} failed: {}", target.display(), e);
            map_io(e)
        })
    }

    fn copy(&mut self, from: &str, to: &str) -> Result<(), StorageError> {
        let target = self.resolve(to);
        Self::ensure_parent(&target)?;
        fs::copy(self.resolve(from), target).map(|_| ()).map_err(map_io)
    }

    fn rename(&mut self, from: &str, to: &str) -> Result<(), StorageError> {
        fs::rename(self.resolve(from), self.resolve(to)).map_err(map_io)
    }

    fn remove(&mut self, path: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.resolve(path)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(map_io(e)),
        }
    }

    fn exists(&self, path: &str) -> bool {
        self.resolve(path).exists()
    }

    fn available_bytes(&self, _path: &str) -> Option<u64> {
        // std has no portable free-space query.
        None
    }
}
