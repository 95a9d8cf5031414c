use anyhow::{bail, Context, Result};
use std::{env, path::PathBuf, time::Duration};

use crate::store::{JsonFileStore, KeyValueStore, MemoryStore, SqliteStore};

pub const DATA_DIR_VAR: &str = "PAGEPAUSE_DATA_DIR";
pub const STORE_VAR: &str = "PAGEPAUSE_STORE";
pub const DEBUG_VAR: &str = "PAGEPAUSE_DEBUG";
pub const TICK_MS_VAR: &str = "PAGEPAUSE_TICK_MS";

const DEFAULT_TICK_MS: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Json,
    Sqlite,
    Memory,
}

impl StoreKind {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(StoreKind::Json),
            "sqlite" => Ok(StoreKind::Sqlite),
            "memory" => Ok(StoreKind::Memory),
            other => bail!("unknown store kind '{other}' (expected json, sqlite or memory)"),
        }
    }
}

/// Process-level settings read from the environment at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct AppSettings {
    pub data_dir: PathBuf,
    pub store: StoreKind,
    pub debug: bool,
    pub tick_interval: Duration,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            store: StoreKind::Json,
            debug: false,
            tick_interval: Duration::from_millis(DEFAULT_TICK_MS),
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(env::temp_dir)
        .join("pagepause")
}

impl AppSettings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Resolve settings through `lookup` so tests need not touch the real
    /// environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut settings = Self::default();
        if let Some(dir) = lookup(DATA_DIR_VAR).filter(|dir| !dir.trim().is_empty()) {
            settings.data_dir = PathBuf::from(dir);
        }
        if let Some(kind) = lookup(STORE_VAR) {
            settings.store = StoreKind::parse(&kind)
                .with_context(|| format!("invalid {STORE_VAR}"))?;
        }
        if let Some(flag) = lookup(DEBUG_VAR) {
            settings.debug = matches!(flag.trim(), "1" | "true" | "yes" | "on");
        }
        if let Some(raw) = lookup(TICK_MS_VAR) {
            let ms: u64 = raw
                .trim()
                .parse()
                .with_context(|| format!("invalid {TICK_MS_VAR} '{raw}'"))?;
            if ms == 0 {
                bail!("{TICK_MS_VAR} must be positive");
            }
            settings.tick_interval = Duration::from_millis(ms);
        }
        Ok(settings)
    }

    pub fn store_path(&self) -> PathBuf {
        match self.store {
            StoreKind::Sqlite => self.data_dir.join("pagepause.sqlite3"),
            StoreKind::Json | StoreKind::Memory => self.data_dir.join("pagepause.json"),
        }
    }

    pub fn open_store(&self) -> Result<Box<dyn KeyValueStore>> {
        let store: Box<dyn KeyValueStore> = match self.store {
            StoreKind::Json => Box::new(JsonFileStore::new(self.store_path())?),
            StoreKind::Sqlite => Box::new(SqliteStore::open(&self.store_path())?),
            StoreKind::Memory => Box::new(MemoryStore::new()),
        };
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let settings = AppSettings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(settings.store, StoreKind::Json);
        assert!(!settings.debug);
        assert_eq!(settings.tick_interval, Duration::from_secs(1));
        assert!(settings.data_dir.ends_with("pagepause"));
    }

    #[test]
    fn overrides_are_applied() {
        let settings = AppSettings::from_lookup(lookup(&[
            (DATA_DIR_VAR, "/tmp/pp"),
            (STORE_VAR, "SQLite"),
            (DEBUG_VAR, "1"),
            (TICK_MS_VAR, "250"),
        ]))
        .unwrap();
        assert_eq!(settings.data_dir, PathBuf::from("/tmp/pp"));
        assert_eq!(settings.store, StoreKind::Sqlite);
        assert!(settings.debug);
        assert_eq!(settings.tick_interval, Duration::from_millis(250));
        assert_eq!(settings.store_path(), PathBuf::from("/tmp/pp/pagepause.sqlite3"));
    }

    #[test]
    fn bad_values_are_rejected() {
        assert!(AppSettings::from_lookup(lookup(&[(STORE_VAR, "redis")])).is_err());
        assert!(AppSettings::from_lookup(lookup(&[(TICK_MS_VAR, "0")])).is_err());
        assert!(AppSettings::from_lookup(lookup(&[(TICK_MS_VAR, "soon")])).is_err());
    }

    #[test]
    fn json_store_lands_in_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let settings = AppSettings {
            data_dir: dir.path().join("nested"),
            ..AppSettings::default()
        };
        let mut store = settings.open_store().unwrap();
        store.set("k", "v").unwrap();
        assert!(dir.path().join("nested/pagepause.json").exists());
    }
}
