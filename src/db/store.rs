use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::NamedTempFile;

use crate::error::{AppError, AppResult};

/// Persistence interface for small JSON blobs: preference maps, tokens,
/// last search and config blobs all go through here.
///
/// Writes are synchronous: once `set` returns, the value is durable.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> AppResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> AppResult<()>;

    fn remove(&self, key: &str) -> AppResult<()>;
}

/// Reads and deserializes a blob. A blob that no longer parses is treated as
/// absent so a schema change never locks a user out of a panel.
pub fn load_json<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> AppResult<Option<T>> {
    let Some(raw) = store.get(key)? else {
        return Ok(None);
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "Discarding unreadable stored blob");
            Ok(None)
        }
    }
}

pub fn save_json<T: Serialize>(store: &dyn KeyValueStore, key: &str, value: &T) -> AppResult<()> {
    let json = serde_json::to_string(value)
        .map_err(|e| AppError::Storage(format!("Serialization error for {}: {}", key, e)))?;
    store.set(key, &json)
}

/// Stores each key as `<dir>/<base64url(key)>.json`
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Opens the store, creating the directory if needed
    pub fn open(dir: impl AsRef<Path>) -> AppResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir).map_err(|e| {
            AppError::Storage(format!("Cannot create data dir {}: {}", dir.display(), e))
        })?;
        tracing::info!(dir = %dir.display(), "Opened file store");
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", URL_SAFE_NO_PAD.encode(key.as_bytes())))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> AppResult<Option<String>> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Storage(format!("Read failed for {}: {}", key, e))),
        }
    }

    fn set(&self, key: &str, value: &str) -> AppResult<()> {
        // Each write gets its own temp file, renamed over the target
        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(|e| write_failed(key, e))?;
        tmp.write_all(value.as_bytes()).map_err(|e| write_failed(key, e))?;
        tmp.persist(self.path_for(key)).map_err(|e| write_failed(key, e))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> AppResult<()> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Storage(format!("Remove failed for {}: {}", key, e))),
        }
    }
}

fn write_failed(key: &str, e: impl std::fmt::Display) -> AppError {
    AppError::Storage(format!("Write failed for {}: {}", key, e))
}

/// In-process store, used in tests and when no data dir is wanted
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> AppResult<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.values
            .lock()
            .map_err(|_| AppError::Internal("Memory store lock poisoned".to_string()))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> AppResult<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> AppResult<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}
