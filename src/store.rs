//! Persisted save data.
//!
//! A small JSON document holding account tokens and module flags. The
//! store is an explicit object passed by handle to whoever needs it, with
//! explicit load/save calls: loaded once at startup, saved at clean
//! shutdown and after operator edits.

use crate::error::StoreError;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// The serialized document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SaveData {
    /// Account tokens to connect at startup.
    #[serde(default)]
    pub tokens: Vec<String>,
    /// Whether the emoji module's substitution is active.
    #[serde(default)]
    pub emoji_replace: bool,
}

/// Shared handle to the store.
pub type StoreHandle = Arc<Store>;

/// Save-data store bound to one file path.
pub struct Store {
    path: PathBuf,
    data: Mutex<SaveData>,
}

impl Store {
    /// Load the store, or start empty if the file does not exist yet.
    pub fn load(path: impl Into<PathBuf>) -> Result<StoreHandle, StoreError> {
        let path = path.into();
        let data = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            let data: SaveData = serde_json::from_str(&raw)?;
            info!(path = %path.display(), "loaded save data");
            data
        } else {
            SaveData::default()
        };
        Ok(Arc::new(Self { path, data: Mutex::new(data) }))
    }

    /// Write the current data to disk.
    pub fn save(&self) -> Result<(), StoreError> {
        let raw = {
            let data = self.data.lock();
            serde_json::to_string_pretty(&*data)?
        };
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, raw)?;
        info!(path = %self.path.display(), "saved save data");
        Ok(())
    }

    /// Read access to the data.
    pub fn with<R>(&self, f: impl FnOnce(&SaveData) -> R) -> R {
        f(&self.data.lock())
    }

    /// Mutate the data in memory. Call [`Store::save`] to persist.
    pub fn update<R>(&self, f: impl FnOnce(&mut SaveData) -> R) -> R {
        f(&mut self.data.lock())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_loads_default() {
        let dir = tempdir().unwrap();
        let store = Store::load(dir.path().join("save.json")).unwrap();
        store.with(|d| {
            assert!(d.tokens.is_empty());
            assert!(!d.emoji_replace);
        });
    }

    #[test]
    fn test_save_and_reload_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("save.json");

        let store = Store::load(&path).unwrap();
        store.update(|d| {
            d.tokens.push("token-a".to_string());
            d.emoji_replace = true;
        });
        store.save().unwrap();

        let reloaded = Store::load(&path).unwrap();
        reloaded.with(|d| {
            assert_eq!(d.tokens, vec!["token-a".to_string()]);
            assert!(d.emoji_replace);
        });
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("save.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(Store::load(&path), Err(StoreError::Format(_))));
    }
}
