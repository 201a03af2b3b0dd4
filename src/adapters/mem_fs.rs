//! In-memory [`FilePort`] backend.
//!
//! Used for simulation, tests and fuzzing.  Supports fault injection for
//! writes, renames and low free space so crash and degradation paths can be
//! exercised without real flash.

use std::cell::Cell;
use std::collections::BTreeMap;

use crate::app::ports::{FilePort, StorageError};

#[derive(Debug, Default)]
pub struct MemFs {
    files: BTreeMap<String, Vec<u8>>,
    fail_writes: bool,
    fail_renames: bool,
    available: Option<u64>,
    writes: usize,
    copies: usize,
    reads: Cell<usize>,
}

impl MemFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a file directly, bypassing fault injection and counters.
    pub fn put(&mut self, path: &str, data: &[u8]) {
        self.files.insert(path.to_string(), data.to_vec());
    }

    pub fn contents(&self, path: &str) -> Option<Vec<u8>> {
        self.files.get(path).cloned()
    }

    pub fn fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    pub fn fail_renames(&mut self, fail: bool) {
        self.fail_renames = fail;
    }

    pub fn set_available_bytes(&mut self, available: Option<u64>) {
        self.available = available;
    }

    pub fn write_count(&self) -> usize {
        self.writes
    }

    pub fn copy_count(&self) -> usize {
        self.copies
    }

    pub fn read_count(&self) -> usize {
        self.reads.get()
    }
}

impl FilePort for MemFs {
    fn read(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        self.reads.set(self.reads.get() + 1);
        self.files.get(path).cloned().ok_or(StorageError::NotFound)
    }

    fn write(&mut self, path: &str, data: &[u8]) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::IoError);
        }
        self.writes += 1;
        self.files.insert(path.to_string(), data.to_vec());
        Ok(())
    }

    fn copy(&mut self, from: &str, to: &str) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::IoError);
        }
        let data = self.files.get(from).cloned().ok_or(StorageError::NotFound)?;
        self.copies += 1;
        self.files.insert(to.to_string(), data);
        Ok(())
    }

    fn rename(&mut self, from: &str, to: &str) -> Result<(), StorageError> {
        if self.fail_renames {
            return Err(StorageError::IoError);
        }
        let data = self.files.remove(from).ok_or(StorageError::NotFound)?;
        self.files.insert(to.to_string(), data);
        Ok(())
    }

    fn remove(&mut self, path: &str) -> Result<(), StorageError> {
        self.files.remove(path);
        Ok(())
    }

    fn exists(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    fn available_bytes(&self, _path: &str) -> Option<u64> {
        self.available
    }
}
