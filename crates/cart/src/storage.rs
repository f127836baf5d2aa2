//! Key-value persistence for the cart cache.
//!
//! The cart persists a single value under a single key, so the surface here
//! is a plain string get/set. Two backends ship with the engine: an
//! in-memory map for tests and ephemeral sessions, and a file-backed store
//! that keeps one file per key and writes through a temp-file rename so a
//! crash mid-write never leaves a half-written cache.

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;

/// Errors raised by the key-value store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Underlying file I/O failed.
    #[error("storage I/O error: {0}")]
    Io(#[from] io::Error),
    /// The key cannot form a file name.
    #[error("invalid storage key: {0:?}")]
    InvalidKey(String),
}

/// A string key-value store with pluggable backing.
///
/// Cheap to clone; all clones share the same backend, so a value written
/// through one handle is visible through every other.
#[derive(Debug, Clone)]
pub struct KeyValueStore {
    backend: Arc<Backend>,
}

#[derive(Debug)]
enum Backend {
    Memory(Mutex<HashMap<String, String>>),
    File { dir: PathBuf },
}

impl KeyValueStore {
    /// A process-local store; contents vanish when the last handle drops.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            backend: Arc::new(Backend::Memory(Mutex::new(HashMap::new()))),
        }
    }

    /// A store that keeps one file per key under `dir`. The directory is
    /// created on first write.
    #[must_use]
    pub fn file(dir: impl Into<PathBuf>) -> Self {
        Self {
            backend: Arc::new(Backend::File { dir: dir.into() }),
        }
    }

    /// Read the value stored under `key`, or `None` if nothing was written.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid keys or failed reads; a missing key or a
    /// missing store directory is `Ok(None)`, not an error.
    pub async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        validate_key(key)?;
        match self.backend.as_ref() {
            Backend::Memory(map) => Ok(map.lock().get(key).cloned()),
            Backend::File { dir } => match tokio::fs::read_to_string(dir.join(key)).await {
                Ok(value) => Ok(Some(value)),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(StorageError::Io(e)),
            },
        }
    }

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid keys or failed writes.
    pub async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        validate_key(key)?;
        match self.backend.as_ref() {
            Backend::Memory(map) => {
                map.lock().insert(key.to_owned(), value.to_owned());
                Ok(())
            }
            Backend::File { dir } => {
                tokio::fs::create_dir_all(dir).await?;
                // Write-then-rename keeps the previous value intact if the
                // process dies mid-write.
                let tmp = dir.join(format!("{key}.tmp"));
                tokio::fs::write(&tmp, value).await?;
                tokio::fs::rename(&tmp, dir.join(key)).await?;
                Ok(())
            }
        }
    }
}

/// Keys double as file names, so restrict them to a safe charset.
fn validate_key(key: &str) -> Result<(), StorageError> {
    let safe = !key.is_empty()
        && key != "."
        && key != ".."
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if safe {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_owned()))
    }
}
