//! In-process change feed.
//!
//! The backend publishes one [`ChangeEvent`] per inserted row. Subscribers pick a table and
//! an event kind and receive the matching row payloads, in publish order, on an `mpsc`
//! channel. Dropping or unsubscribing the [`SubscriptionHandle`] stops delivery and closes
//! the channel.

mod payload;

pub use payload::*;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use uuid::Uuid;

pub const CONGESTION_TABLE: &str = "congestion_statuses";
pub const STORE_TAGS_TABLE: &str = "store_tags";

/// Kind of row change carried by a feed event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// A single row change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    pub table: String,
    pub event_type: ChangeKind,
    /// The row after the change, in its snake_case source shape
    pub new: serde_json::Value,
}

impl ChangeEvent {
    pub fn insert(table: &str, row: serde_json::Value) -> Self {
        Self {
            table: table.to_string(),
            event_type: ChangeKind::Insert,
            new: row,
        }
    }
}

/// Fan-out point for row change events.
#[derive(Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<ChangeEvent>,
    capacity: usize,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Publish an event to every live subscription. Having no subscribers is fine.
    pub fn publish(&self, event: ChangeEvent) {
        let _ = self.tx.send(event);
    }

    /// Subscribe to events of one kind on one table.
    ///
    /// Must be called from within a tokio runtime. Events published after this call returns
    /// are delivered even if the forwarding task has not been polled yet.
    pub fn subscribe(
        &self,
        table: &str,
        kind: ChangeKind,
    ) -> (SubscriptionHandle, mpsc::Receiver<serde_json::Value>) {
        let mut events = self.tx.subscribe();
        let (tx, rx) = mpsc::channel(self.capacity);
        let id = Uuid::new_v4();
        let table = table.to_string();
        let filter_table = table.clone();

        let forwarder = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) if event.table == filter_table && event.event_type == kind => {
                        if tx.send(event.new).await.is_err() {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(
                            subscription = %id,
                            "Change feed subscriber lagged, {} events dropped",
                            skipped
                        );
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            tracing::debug!(subscription = %id, "Change feed forwarder stopped");
        });

        tracing::debug!(subscription = %id, table = %table, ?kind, "Subscribed to change feed");

        (
            SubscriptionHandle {
                id,
                table,
                forwarder: Some(forwarder),
            },
            rx,
        )
    }
}

/// Ownership of one feed subscription. Released exactly once, on `unsubscribe` or drop.
pub struct SubscriptionHandle {
    id: Uuid,
    table: String,
    forwarder: Option<JoinHandle<()>>,
}

impl SubscriptionHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Stop delivery. The paired receiver yields `None` once buffered payloads are drained.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(forwarder) = self.forwarder.take() {
            forwarder.abort();
            tracing::debug!(subscription = %self.id, table = %self.table, "Unsubscribed from change feed");
        }
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.release();
    }
}
