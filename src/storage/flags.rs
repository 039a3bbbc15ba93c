//! Small persisted key-value area for one-time flags.
//!
//! Kept outside the SQLite database so it survives schema changes there.
//! Values are stored as a flat JSON object.

use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use thiserror::Error;

/// Key for a flag scoped to a user id, `"<name>_<user id or unknown>"`.
pub fn flag_key(name: &str, user_id: Option<&str>) -> String {
    format!("{}_{}", name, user_id.unwrap_or("unknown"))
}

/// Durable flag store.
pub struct FlagStore {
    path: Option<PathBuf>,
    values: Mutex<Map<String, Value>>,
}

impl FlagStore {
    /// Open the flag file at `path`, starting empty when it does not exist.
    pub fn open(path: &Path) -> Result<Self, FlagError> {
        let values = if path.exists() {
            let content =
                std::fs::read_to_string(path).map_err(|e| FlagError::IoError(e.to_string()))?;
            if content.trim().is_empty() {
                Map::new()
            } else {
                serde_json::from_str(&content).map_err(|e| FlagError::ParseError(e.to_string()))?
            }
        } else {
            Map::new()
        };

        Ok(Self {
            path: Some(path.to_path_buf()),
            values: Mutex::new(values),
        })
    }

    /// Flag store that is never written to disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            values: Mutex::new(Map::new()),
        }
    }

    /// Read a boolean flag; unset reads as `false`.
    pub fn get_bool(&self, key: &str) -> bool {
        self.lock().get(key).and_then(Value::as_bool).unwrap_or(false)
    }

    /// Set a boolean flag and persist.
    pub fn set_bool(&self, key: &str, value: bool) -> Result<(), FlagError> {
        self.set(key, Value::Bool(value))
    }

    /// Read a string value.
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.lock().get(key).and_then(Value::as_str).map(str::to_string)
    }

    /// Set a string value and persist.
    pub fn set_string(&self, key: &str, value: &str) -> Result<(), FlagError> {
        self.set(key, Value::String(value.to_string()))
    }

    /// The in-memory value changes only once the file write succeeded.
    fn set(&self, key: &str, value: Value) -> Result<(), FlagError> {
        let mut values = self.lock();
        let mut updated = values.clone();
        updated.insert(key.to_string(), value);
        self.persist(&updated)?;
        *values = updated;
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Map<String, Value>> {
        self.values.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write through a temp file so a crash never leaves a torn flag file.
    fn persist(&self, values: &Map<String, Value>) -> Result<(), FlagError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| FlagError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(values)
            .map_err(|e| FlagError::SerializeError(e.to_string()))?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, content).map_err(|e| FlagError::IoError(e.to_string()))?;
        std::fs::rename(&tmp, path).map_err(|e| FlagError::IoError(e.to_string()))?;

        Ok(())
    }
}

/// Flag store errors.
#[derive(Debug, Error)]
pub enum FlagError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),
}
