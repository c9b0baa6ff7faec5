//! String key-value storage, the profile-local equivalent of `localStorage`.
//!
//! Two backends:
//!   - `MemoryStore`: process-local map, used by tests and ephemeral runs
//!   - `FileStore`: one JSON object per file, rewritten whole on every write
//!
//! Read paths degrade malformed files to "empty"; write paths surface I/O
//! failures as `StorageError` so a broken profile fails loudly.
//!
//! `FileStore` does blocking `std::fs` calls. Callers reach it from async
//! handlers while holding the session mutex; with one small profile file
//! per store this stays well under a millisecond per call.

use std::{
  collections::BTreeMap,
  fs,
  path::{Path, PathBuf},
  sync::Mutex,
};

use thiserror::Error;
use tracing::{debug, instrument, warn};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
  #[error("storage I/O error at {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("serialization error: {0}")]
  Serialization(String),

  #[error("storage unavailable: {0}")]
  Unavailable(String),

  #[error("cookie expiry out of range: {0} days from now")]
  ExpiryOutOfRange(i64),
}

pub trait KeyValueStore: Send + Sync {
  fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;
  fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

#[derive(Default)]
pub struct MemoryStore {
  items: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

impl KeyValueStore for MemoryStore {
  fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
    let guard = self
      .items
      .lock()
      .map_err(|e| StorageError::Unavailable(e.to_string()))?;
    Ok(guard.get(key).cloned())
  }

  fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
    let mut guard = self
      .items
      .lock()
      .map_err(|e| StorageError::Unavailable(e.to_string()))?;
    guard.insert(key.to_string(), value.to_string());
    Ok(())
  }
}

/// JSON-file backed store. The mutex serializes read-modify-write cycles
/// within this process; concurrent writers from other processes can race.
pub struct FileStore {
  path: PathBuf,
  lock: Mutex<()>,
}

impl FileStore {
  /// Open (or prepare to create) the store file. Creates the parent directory
  /// so a misconfigured profile path is reported at startup.
  pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
    let path = path.into();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
      fs::create_dir_all(parent).map_err(|source| StorageError::Io {
        path: parent.to_path_buf(),
        source,
      })?;
    }
    Ok(Self { path, lock: Mutex::new(()) })
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  fn read_map(&self) -> Result<BTreeMap<String, String>, StorageError> {
    let raw = match fs::read_to_string(&self.path) {
      Ok(s) => s,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
      Err(source) => return Err(StorageError::Io { path: self.path.clone(), source }),
    };
    if raw.trim().is_empty() {
      return Ok(BTreeMap::new());
    }
    match serde_json::from_str(&raw) {
      Ok(map) => Ok(map),
      Err(e) => {
        warn!(target: "trivia_quiz", path = %self.path.display(), error = %e, "Malformed storage file; treating as empty");
        Ok(BTreeMap::new())
      }
    }
  }

  fn write_map(&self, map: &BTreeMap<String, String>) -> Result<(), StorageError> {
    let body = serde_json::to_string_pretty(map).map_err(|e| StorageError::Serialization(e.to_string()))?;
    fs::write(&self.path, body).map_err(|source| StorageError::Io { path: self.path.clone(), source })?;
    debug!(target: "trivia_quiz", path = %self.path.display(), keys = map.len(), "Storage file written");
    Ok(())
  }
}

impl KeyValueStore for FileStore {
  #[instrument(level = "debug", skip(self), fields(path = %self.path.display()))]
  fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
    let _guard = self.lock.lock().map_err(|e| StorageError::Unavailable(e.to_string()))?;
    Ok(self.read_map()?.remove(key))
  }

  #[instrument(level = "debug", skip(self, value), fields(path = %self.path.display(), value_len = value.len()))]
  fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
    let _guard = self.lock.lock().map_err(|e| StorageError::Unavailable(e.to_string()))?;
    let mut map = self.read_map()?;
    map.insert(key.to_string(), value.to_string());
    self.write_map(&map)
  }
}

#[cfg(test)]
pub(crate) fn scratch_dir(label: &str) -> PathBuf {
  std::env::temp_dir().join(format!("trivia-quiz-{label}-{}", uuid::Uuid::new_v4()))
}
