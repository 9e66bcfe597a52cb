//! Latest-status-per-store bookkeeping.
//!
//! Updates are last-applied-wins: `apply_one` never compares timestamps, so an older row
//! applied after a newer one replaces it. A bulk reload that is still in flight when a push
//! event lands can therefore overwrite the fresher push entry, and vice versa.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::models::CongestionStatus;
use crate::query::ChangeReceiver;
use crate::realtime::decode_status;

use super::session::SessionState;

/// Mapping from store id to the most recently applied status for that store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusMap {
    entries: HashMap<String, CongestionStatus>,
}

impl StatusMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole mapping.
    pub fn apply_bulk(&mut self, statuses: Vec<CongestionStatus>) {
        self.entries = statuses
            .into_iter()
            .map(|status| (status.store_id.clone(), status))
            .collect();
    }

    /// Upsert one entry, returning the one it replaced.
    pub fn apply_one(&mut self, status: CongestionStatus) -> Option<CongestionStatus> {
        self.entries.insert(status.store_id.clone(), status)
    }

    pub fn get(&self, store_id: &str) -> Option<&CongestionStatus> {
        self.entries.get(store_id)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All current entries ordered by store id.
    pub fn to_vec(&self) -> Vec<CongestionStatus> {
        let mut statuses: Vec<CongestionStatus> = self.entries.values().cloned().collect();
        statuses.sort_by(|a, b| a.store_id.cmp(&b.store_id));
        statuses
    }
}

/// Drain push payloads into the session's status map until the channel closes or the
/// session goes dead. Liveness is checked under the write lock, right before applying.
pub(crate) fn spawn_push_consumer(
    mut payloads: ChangeReceiver,
    state: Arc<RwLock<SessionState>>,
    alive: Arc<AtomicBool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(payload) = payloads.recv().await {
            let status = match decode_status(payload) {
                Ok(status) => status,
                Err(err) => {
                    tracing::warn!("Discarding push event: {}", err);
                    continue;
                }
            };

            let mut state = state.write().await;
            if !alive.load(Ordering::SeqCst) {
                tracing::debug!(store_id = %status.store_id, "Session closed, dropping push");
                break;
            }
            tracing::debug!(
                store_id = %status.store_id,
                status = %status.status,
                "Applying pushed congestion status"
            );
            state.statuses.apply_one(status);
        }
        tracing::debug!("Push consumer stopped");
    })
}
