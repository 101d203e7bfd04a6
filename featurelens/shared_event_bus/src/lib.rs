#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Lifecycle event bus used to observe submissions from outside the controller.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::{fs::OpenOptions, io::AsyncWriteExt, sync::broadcast};

/// Event record encoded as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    /// Unique identifier.
    pub id: String,
    /// Component producing the event.
    pub source: String,
    /// Event type (e.g., `submission.rendered`).
    pub event_type: String,
    /// Emission time.
    pub timestamp: DateTime<Utc>,
    /// Arbitrary JSON payload.
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl EventRecord {
    /// Creates a record stamped with the current time.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        event_type: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            event_type: event_type.into(),
            timestamp: Utc::now(),
            payload,
        }
    }
}

/// Event publisher interface.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publishes an event to the bus.
    async fn publish(&self, event: EventRecord) -> Result<()>;
}

/// Event subscriber interface.
#[async_trait]
pub trait EventSubscriber: Send + Sync {
    /// Returns a receiver that yields every event published after the call.
    async fn subscribe(&self) -> Result<broadcast::Receiver<EventRecord>>;
}

/// In-memory broadcast bus retaining a bounded backlog.
#[derive(Debug, Clone)]
pub struct MemoryEventBus {
    sender: broadcast::Sender<EventRecord>,
    backlog: Arc<Mutex<VecDeque<EventRecord>>>,
    retain: usize,
}

impl MemoryEventBus {
    /// Creates a new bus with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let retain = capacity.max(1);
        let (sender, _) = broadcast::channel(retain);
        Self {
            sender,
            backlog: Arc::new(Mutex::new(VecDeque::with_capacity(retain))),
            retain,
        }
    }

    /// Snapshot of recent events retained in memory, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<EventRecord> {
        self.backlog.lock().iter().cloned().collect()
    }

    /// Event types of the retained backlog, oldest first.
    #[must_use]
    pub fn event_types(&self) -> Vec<String> {
        self.backlog
            .lock()
            .iter()
            .map(|event| event.event_type.clone())
            .collect()
    }
}

/// File-backed publisher appending JSON lines.
#[derive(Debug, Clone)]
pub struct FileEventPublisher {
    path: PathBuf,
}

impl FileEventPublisher {
    /// Creates a publisher that appends JSON lines to the given path.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self { path })
    }
}

#[async_trait]
impl EventPublisher for MemoryEventBus {
    async fn publish(&self, event: EventRecord) -> Result<()> {
        {
            let mut backlog = self.backlog.lock();
            backlog.push_back(event.clone());
            while backlog.len() > self.retain {
                backlog.pop_front();
            }
        }
        // No receivers is not an error for a broadcast bus.
        let _ = self.sender.send(event);
        Ok(())
    }
}

#[async_trait]
impl EventSubscriber for MemoryEventBus {
    async fn subscribe(&self) -> Result<broadcast::Receiver<EventRecord>> {
        Ok(self.sender.subscribe())
    }
}

#[async_trait]
impl EventPublisher for FileEventPublisher {
    async fn publish(&self, event: EventRecord) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        let mut data = serde_json::to_vec(&event)?;
        data.push(b'\n');
        file.write_all(&data).await?;
        file.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_event(kind: &str) -> EventRecord {
        EventRecord::new(
            "evt-1",
            "client.controller",
            kind,
            serde_json::json!({ "status": 200 }),
        )
    }

    #[tokio::test]
    async fn publishes_and_receives() {
        let bus = MemoryEventBus::new(16);
        let mut rx = bus.subscribe().await.unwrap();
        bus.publish(sample_event("submission.started")).await.unwrap();
        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_type, "submission.started");
    }

    #[tokio::test]
    async fn backlog_is_bounded() {
        let bus = MemoryEventBus::new(2);
        for kind in ["a", "b", "c"] {
            bus.publish(sample_event(kind)).await.unwrap();
        }
        assert_eq!(bus.event_types(), vec!["b".to_string(), "c".to_string()]);
    }

    #[tokio::test]
    async fn file_publisher_writes_events() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        let publisher = FileEventPublisher::new(&path).unwrap();
        publisher
            .publish(sample_event("submission.failed"))
            .await
            .unwrap();
        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.contains("submission.failed"));
    }
}
