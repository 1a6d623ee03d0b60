//! Advisory single-writer/single-reader lock over the graph store file:
//! two processes must never open the index directory's graph store
//! simultaneously.

use dotmd_core::{DotmdError, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// Holds an exclusive advisory lock on `<index_dir>/.dotmd.lock` for the
/// lifetime of the value. Dropping it releases the lock.
pub struct IndexLock {
    _file: File,
    path: PathBuf,
}

impl IndexLock {
    /// Acquires the lock, creating the index directory if needed. Blocks
    /// the current thread until the lock is available; callers that need
    /// non-blocking semantics should use `try_acquire`.
    pub fn acquire(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| DotmdError::index_write("lock", e.to_string()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .open(path)
            .map_err(|e| DotmdError::index_write("lock", e.to_string()))?;
        file.lock_exclusive()
            .map_err(|e| DotmdError::index_write("lock", format!("index already locked: {e}")))?;
        Ok(Self {
            _file: file,
            path: path.to_path_buf(),
        })
    }

    /// Non-blocking variant: returns `Ok(None)` instead of blocking if
    /// another process already holds the lock.
    pub fn try_acquire(path: &Path) -> Result<Option<Self>> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| DotmdError::index_write("lock", e.to_string()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .open(path)
            .map_err(|e| DotmdError::index_write("lock", e.to_string()))?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(Self {
                _file: file,
                path: path.to_path_buf(),
            })),
            Err(_) => Ok(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for IndexLock {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self._file);
    }
}
