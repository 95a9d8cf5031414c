use anyhow::{Context, Result};
use std::{collections::BTreeMap, fs, path::PathBuf};

use super::KeyValueStore;

/// All keys of one profile in a single pretty-printed JSON object.
///
/// Every access reads the file, and a mutation rewrites it with only its
/// own key changed, so processes sharing the file keep each other's keys.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create store directory {}", parent.display())
            })?;
        }
        let store = Self { path };
        store.read()?;
        Ok(store)
    }

    /// Missing file reads as empty; so does a corrupt one, which the next
    /// write replaces.
    fn read(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read store from {}", self.path.display()))?;
        Ok(serde_json::from_str(&contents).unwrap_or_else(|err| {
            log::warn!("Ignoring unreadable store {}: {err}", self.path.display());
            BTreeMap::new()
        }))
    }

    fn write(&self, data: &BTreeMap<String, String>) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write store to {}", self.path.display()))
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read()?.remove(key))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut data = self.read()?;
        data.insert(key.to_string(), value.to_string());
        self.write(&data)
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        let mut data = self.read()?;
        if data.remove(key).is_some() {
            self.write(&data)?;
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "json"
    }
}
