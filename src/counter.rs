//! Persistent page-hit counter mirrored across tabs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::broadcast::{TabLink, TabMessage, COUNTER_TOPIC};
use crate::error::{PagePauseError, Result};
use crate::host::Host;
use crate::store::keys;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::log_info;

/// Shape of an exported counter file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterExport {
    pub hit_count: u64,
    pub last_hit: Option<DateTime<Utc>>,
    pub exported_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct VisitCounter {
    count: u64,
    last_hit: Option<DateTime<Utc>>,
    link: Option<TabLink>,
}

impl VisitCounter {
    pub fn new(link: Option<TabLink>) -> Self {
        Self {
            link,
            ..Self::default()
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn last_hit(&self) -> Option<DateTime<Utc>> {
        self.last_hit
    }

    pub fn restore(&mut self, host: &mut Host<'_>) {
        self.count = host.storage.load(keys::HIT_COUNT).unwrap_or(0);
        self.last_hit = host.storage.load(keys::LAST_HIT);
    }

    pub fn record_visit(&mut self, host: &mut Host<'_>) -> u64 {
        let now = host.now();
        self.count += 1;
        self.last_hit = Some(now);
        host.storage.save(keys::LAST_HIT, &now);
        self.publish(host);
        self.count
    }

    pub fn set(&mut self, host: &mut Host<'_>, count: u64) {
        self.count = count;
        self.publish(host);
    }

    pub fn reset(&mut self, host: &mut Host<'_>) {
        log_info!("visit counter reset from {}", self.count);
        self.set(host, 0);
    }

    pub fn export(&self, now: DateTime<Utc>) -> Result<String> {
        let export = CounterExport {
            hit_count: self.count,
            last_hit: self.last_hit,
            exported_at: now,
        };
        serde_json::to_string_pretty(&export)
            .map_err(|err| PagePauseError::InvalidInput(err.to_string()))
    }

    pub fn import(&mut self, host: &mut Host<'_>, raw: &str) -> Result<u64> {
        let export: CounterExport = serde_json::from_str(raw)
            .map_err(|err| PagePauseError::InvalidInput(format!("invalid counter file: {err}")))?;
        self.last_hit = export.last_hit;
        if let Some(last_hit) = export.last_hit {
            host.storage.save(keys::LAST_HIT, &last_hit);
        }
        self.set(host, export.hit_count);
        Ok(self.count)
    }

    /// Another tab reported a count; only a newer (larger) one is adopted.
    pub fn on_remote_count(&mut self, host: &mut Host<'_>, count: u64) -> bool {
        if count <= self.count {
            return false;
        }
        self.count = count;
        host.effects.counter_updated(count);
        true
    }

    fn publish(&self, host: &mut Host<'_>) {
        host.storage.save(keys::HIT_COUNT, &self.count);
        host.effects.counter_updated(self.count);
        if let Some(link) = &self.link {
            link.publish(COUNTER_TOPIC, TabMessage::CounterUpdate { count: self.count });
        }
    }
}
