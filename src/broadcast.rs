//! Cross-tab messaging: topic-keyed publish/subscribe.
//!
//! Every tab of a profile holds a [`TabLink`] onto the same hub. Messages
//! carry the sender's origin id so a tab never reacts to its own writes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use uuid::Uuid;

pub const COUNTER_TOPIC: &str = "pagepause-counter";
pub const STORAGE_TOPIC: &str = "pagepause-storage";

const TOPIC_CAPACITY: usize = 64;

/// The standard storage-change notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageChange {
    pub key: String,
    pub new_value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TabMessage {
    CounterUpdate { count: u64 },
    StorageChange(StorageChange),
}

#[derive(Debug, Clone)]
pub struct Envelope {
    pub origin: Uuid,
    pub message: TabMessage,
}

#[derive(Clone, Default)]
pub struct BroadcastHub {
    topics: Arc<Mutex<HashMap<String, broadcast::Sender<Envelope>>>>,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn sender(&self, topic: &str) -> broadcast::Sender<Envelope> {
        let mut topics = self.topics.lock().unwrap_or_else(|p| p.into_inner());
        topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(TOPIC_CAPACITY).0)
            .clone()
    }

    /// Returns how many subscribers received the message.
    pub fn publish(&self, topic: &str, envelope: Envelope) -> usize {
        self.sender(topic).send(envelope).unwrap_or(0)
    }

    pub fn subscribe(&self, topic: &str) -> broadcast::Receiver<Envelope> {
        self.sender(topic).subscribe()
    }
}

/// One tab's connection to the hub.
#[derive(Clone)]
pub struct TabLink {
    hub: BroadcastHub,
    origin: Uuid,
}

impl TabLink {
    pub fn new(hub: BroadcastHub) -> Self {
        Self {
            hub,
            origin: Uuid::new_v4(),
        }
    }

    pub fn publish(&self, topic: &str, message: TabMessage) -> usize {
        self.hub.publish(
            topic,
            Envelope {
                origin: self.origin,
                message,
            },
        )
    }

    pub fn subscribe(&self, topic: &str) -> TabSubscription {
        TabSubscription {
            rx: self.hub.subscribe(topic),
            origin: self.origin,
        }
    }
}

pub struct TabSubscription {
    rx: broadcast::Receiver<Envelope>,
    origin: Uuid,
}

impl TabSubscription {
    /// Next message from another tab; `None` once the hub is gone.
    pub async fn recv(&mut self) -> Option<TabMessage> {
        loop {
            match self.rx.recv().await {
                Ok(envelope) if envelope.origin == self.origin => continue,
                Ok(envelope) => return Some(envelope.message),
                Err(RecvError::Lagged(skipped)) => {
                    log::warn!("tab subscription lagged, {skipped} message(s) dropped");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking variant for synchronous hosts.
    pub fn try_recv(&mut self) -> Option<TabMessage> {
        loop {
            match self.rx.try_recv() {
                Ok(envelope) if envelope.origin == self.origin => continue,
                Ok(envelope) => return Some(envelope.message),
                Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }
}
