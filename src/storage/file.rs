//! File-backed storage backend.
//!
//! Each key maps to one JSON document under the store's root directory.
//! Uses write-to-temp-then-rename for crash safety: readers never observe a
//! partially written record.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::state::UsageState;
use crate::storage::traits::{StateStore, StorageError};

fn io_err(e: &std::io::Error) -> StorageError {
    StorageError::Io(e.to_string())
}

/// File-backed [`StateStore`].
///
/// A key `k` is stored at `<dir>/<sanitized-k>.json`, where sanitization
/// replaces every byte outside `[A-Za-z0-9._-]` with `_`. No file locking is
/// performed; a single logical writer per key is assumed, not enforced.
#[derive(Debug)]
pub struct FileStateStore {
    dir: PathBuf,
}

impl FileStateStore {
    /// Opens (creating if necessary) a store rooted at `dir`.
    ///
    /// # Errors
    /// Returns [`StorageError::Io`] if the directory cannot be created.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| io_err(&e))?;
        Ok(Self { dir })
    }

    /// Returns the root directory of this store.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let sanitized: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{sanitized}.json"))
    }
}

impl StateStore for FileStateStore {
    fn get(&self, key: &str) -> Result<Option<UsageState>, StorageError> {
        let path = self.path_for(key);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_err(&e)),
        };

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| StorageError::Serialization(e.to_string()))
    }

    fn set(&self, key: &str, state: &UsageState) -> Result<(), StorageError> {
        let path = self.path_for(key);
        let tmp_path = path.with_extension("json.tmp");

        let data = serde_json::to_vec_pretty(state)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        let mut file = fs::File::create(&tmp_path).map_err(|e| io_err(&e))?;
        file.write_all(&data).map_err(|e| io_err(&e))?;
        file.sync_all().map_err(|e| io_err(&e))?;

        // Atomic rename
        fs::rename(&tmp_path, &path).map_err(|e| io_err(&e))?;
        Ok(())
    }
}
