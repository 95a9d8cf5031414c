//! Persistence gateway: string key-value backends plus a typed wrapper.

pub mod json_file;
pub mod memory;
pub mod sqlite;

use anyhow::Result;
use serde::{de::DeserializeOwned, Serialize};

use crate::broadcast::{StorageChange, TabLink, TabMessage, STORAGE_TOPIC};
use crate::error::PagePauseError;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

pub mod keys {
    pub const TIMER_STATE: &str = "pagepause-state";
    pub const TASKS: &str = "pagepause-tasks";
    pub const REMINDERS: &str = "pagepause-reminders";
    pub const HIT_COUNT: &str = "pagepause-page-hit-count";
    pub const LAST_HIT: &str = "pagepause-last-hit-timestamp";
}

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn delete(&mut self, key: &str) -> Result<()>;
    fn name(&self) -> &'static str;
}

/// Typed access to the active backend.
///
/// The first backend failure switches the wrapper to a fresh in-memory
/// store for the rest of the process; callers never see the error.
pub struct Storage {
    backend: Box<dyn KeyValueStore>,
    degraded: bool,
    link: Option<TabLink>,
}

impl Storage {
    pub fn new(backend: Box<dyn KeyValueStore>) -> Self {
        Self {
            backend,
            degraded: false,
            link: None,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryStore::new()))
    }

    /// Announce every write to other tabs of the same profile.
    pub fn with_broadcast(mut self, link: TabLink) -> Self {
        self.link = Some(link);
        self
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn get_raw(&mut self, key: &str) -> Option<String> {
        match self.backend.get(key) {
            Ok(value) => value,
            Err(err) => {
                self.degrade(err);
                None
            }
        }
    }

    pub fn set_raw(&mut self, key: &str, value: &str) {
        if let Err(err) = self.backend.set(key, value) {
            self.degrade(err);
            // The memory fallback cannot fail.
            let _ = self.backend.set(key, value);
        }
        self.announce(key, Some(value.to_string()));
    }

    pub fn delete(&mut self, key: &str) {
        if let Err(err) = self.backend.delete(key) {
            self.degrade(err);
        }
        self.announce(key, None);
    }

    /// Mirror a write another tab already made, without re-announcing it.
    pub fn absorb(&mut self, change: &StorageChange) {
        let result = match &change.new_value {
            Some(value) => self.backend.set(&change.key, value),
            None => self.backend.delete(&change.key),
        };
        if let Err(err) = result {
            self.degrade(err);
        }
    }

    /// Missing keys and unparseable blobs both load as `None`.
    pub fn load<T: DeserializeOwned>(&mut self, key: &str) -> Option<T> {
        let raw = self.get_raw(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                log_warn!("discarding unreadable {key}: {err}");
                None
            }
        }
    }

    pub fn save<T: Serialize>(&mut self, key: &str, value: &T) {
        match serde_json::to_string(value) {
            Ok(raw) => self.set_raw(key, &raw),
            Err(err) => log_warn!("failed to serialize {key}: {err}"),
        }
    }

    fn degrade(&mut self, err: anyhow::Error) {
        if self.degraded {
            return;
        }
        let failure = PagePauseError::StorageUnavailable(format!(
            "{} backend failed ({err:#}); continuing in memory",
            self.backend.name()
        ));
        log_warn!("{failure}");
        self.backend = Box::new(MemoryStore::new());
        self.degraded = true;
    }

    fn announce(&self, key: &str, new_value: Option<String>) {
        if let Some(link) = &self.link {
            let delivered = link.publish(
                STORAGE_TOPIC,
                TabMessage::StorageChange(StorageChange {
                    key: key.to_string(),
                    new_value,
                }),
            );
            log_debug!("storage change for {key} reached {delivered} tab(s)");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use serde::Deserialize;

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<String>> {
            Err(anyhow!("quota exceeded"))
        }
        fn set(&mut self, _key: &str, _value: &str) -> Result<()> {
            Err(anyhow!("quota exceeded"))
        }
        fn delete(&mut self, _key: &str) -> Result<()> {
            Err(anyhow!("quota exceeded"))
        }
        fn name(&self) -> &'static str {
            "broken"
        }
    }

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Blob {
        count: u32,
    }

    #[test]
    fn typed_round_trip() {
        let mut storage = Storage::in_memory();
        storage.save("blob", &Blob { count: 4 });
        assert_eq!(storage.load::<Blob>("blob"), Some(Blob { count: 4 }));
        storage.delete("blob");
        assert_eq!(storage.load::<Blob>("blob"), None);
    }

    #[test]
    fn garbage_loads_as_none() {
        let mut storage = Storage::in_memory();
        storage.set_raw("blob", "[1,2");
        assert_eq!(storage.load::<Blob>("blob"), None);
    }

    #[test]
    fn absorbed_changes_are_not_rebroadcast() {
        use crate::broadcast::{BroadcastHub, TabLink};

        let hub = BroadcastHub::new();
        let observer = TabLink::new(hub.clone());
        let mut inbox = observer.subscribe(STORAGE_TOPIC);
        let mut storage = Storage::in_memory().with_broadcast(TabLink::new(hub));

        storage.absorb(&StorageChange {
            key: "blob".into(),
            new_value: Some("{\"count\":2}".into()),
        });
        assert_eq!(storage.load::<Blob>("blob"), Some(Blob { count: 2 }));
        assert_eq!(inbox.try_recv(), None);

        storage.save("blob", &Blob { count: 3 });
        assert!(matches!(inbox.try_recv(), Some(TabMessage::StorageChange(_))));
    }

    #[test]
    fn failing_backend_degrades_to_memory() {
        let mut storage = Storage::new(Box::new(BrokenStore));
        assert!(!storage.is_degraded());
        storage.save("blob", &Blob { count: 1 });
        assert!(storage.is_degraded());
        assert_eq!(storage.backend_name(), "memory");
        assert_eq!(storage.load::<Blob>("blob"), Some(Blob { count: 1 }));
    }
}
