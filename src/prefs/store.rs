//! Key-value preference storage
//!
//! `JsonPreferences` keeps every value in memory and, when backed by a file,
//! rewrites the whole JSON object after each change. Writers serialise on a
//! separate lock, so readers never wait on the file system.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde_json::{Map, Value};
use tracing::debug;

/// Errors that can occur while reading or writing preferences
#[derive(Debug, thiserror::Error)]
pub enum PrefsError {
    #[error("failed to access preference file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("preference file {path} is not a JSON object: {source}")]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// String-keyed boolean / integer store
pub trait PreferenceStore: Send + Sync {
    fn bool(&self, key: &str) -> Option<bool>;
    fn int(&self, key: &str) -> Option<i64>;
    fn set_bool(&self, key: &str, value: bool) -> Result<(), PrefsError>;
    fn set_int(&self, key: &str, value: i64) -> Result<(), PrefsError>;
}

/// Preference store serialised as a flat JSON object
pub struct JsonPreferences {
    path: Option<PathBuf>,
    values: Mutex<Map<String, Value>>,
    writer: Mutex<()>,
}

impl JsonPreferences {
    /// A store that is never written to disk
    #[cfg(test)]
    pub fn in_memory() -> Self {
        Self {
            path: None,
            values: Mutex::new(Map::new()),
            writer: Mutex::new(()),
        }
    }

    /// Open a file-backed store; a missing file starts empty
    pub fn open(path: &Path) -> Result<Self, PrefsError> {
        let values = match std::fs::read(path) {
            Ok(bytes) if bytes.is_empty() => Map::new(),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| PrefsError::Format {
                path: path.to_owned(),
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(source) => {
                return Err(PrefsError::Io {
                    path: path.to_owned(),
                    source,
                })
            }
        };
        debug!(?path, entries = values.len(), "preferences loaded");

        Ok(Self {
            path: Some(path.to_owned()),
            values: Mutex::new(values),
            writer: Mutex::new(()),
        })
    }

    fn values(&self) -> MutexGuard<'_, Map<String, Value>> {
        self.values.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn insert(&self, key: &str, value: Value) -> Result<(), PrefsError> {
        let _writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        let snapshot = {
            let mut values = self.values();
            values.insert(key.to_string(), value);
            values.clone()
        };
        self.persist(&snapshot)
    }

    /// Replace the file via a temporary sibling and rename
    fn persist(&self, values: &Map<String, Value>) -> Result<(), PrefsError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let io_err = |source| PrefsError::Io {
            path: path.clone(),
            source,
        };
        let bytes = serde_json::to_vec_pretty(values).map_err(|source| PrefsError::Format {
            path: path.clone(),
            source,
        })?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, bytes).map_err(io_err)?;
        std::fs::rename(&tmp, path).map_err(io_err)?;
        Ok(())
    }
}

impl PreferenceStore for JsonPreferences {
    fn bool(&self, key: &str) -> Option<bool> {
        self.values().get(key).and_then(Value::as_bool)
    }

    fn int(&self, key: &str) -> Option<i64> {
        self.values().get(key).and_then(Value::as_i64)
    }

    fn set_bool(&self, key: &str, value: bool) -> Result<(), PrefsError> {
        self.insert(key, Value::Bool(value))
    }

    fn set_int(&self, key: &str, value: i64) -> Result<(), PrefsError> {
        self.insert(key, Value::from(value))
    }
}
