//! Session-scoped synchronization state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;

use super::filter::filter_by_tags;
use super::loader::load;
use super::reconciler::{spawn_push_consumer, StatusMap};
use crate::auth::AuthGate;
use crate::errors::{AppError, STATUS_WRITE_FAILED_MESSAGE, TAG_WRITE_FAILED_MESSAGE};
use crate::models::{
    CongestionLevel, CongestionStatus, CongestionStatusRow, HashTag, Store, StoreTag,
};
use crate::query::QueryInterface;
use crate::realtime::{ChangeKind, SubscriptionHandle, CONGESTION_TABLE};

/// Where the session is in its load cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "camelCase")]
pub enum LoadPhase {
    Loading,
    Ready,
    /// The last load failed; the view stays blocked until a reload succeeds
    Failed(String),
}

#[derive(Debug)]
pub(crate) struct SessionState {
    pub(crate) phase: LoadPhase,
    pub(crate) stores: Vec<Store>,
    pub(crate) tags: Vec<HashTag>,
    pub(crate) statuses: StatusMap,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            phase: LoadPhase::Loading,
            stores: Vec::new(),
            tags: Vec::new(),
            statuses: StatusMap::new(),
        }
    }
}

/// Snapshot of everything the view renders.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub phase: LoadPhase,
    pub stores: Vec<Store>,
    pub congestion_statuses: Vec<CongestionStatus>,
    pub hash_tags: Vec<HashTag>,
}

/// A synchronized view of stores, statuses and tags.
///
/// Owns its change feed subscription and push consumer. Call [`SyncSession::shutdown`] when
/// the consuming view goes away; load results and pushes that resolve afterwards are
/// discarded. Writes are made on behalf of the [`AuthGate`] passed in by the caller.
pub struct SyncSession {
    query: Arc<dyn QueryInterface>,
    state: Arc<RwLock<SessionState>>,
    alive: Arc<AtomicBool>,
    subscription: Mutex<Option<SubscriptionHandle>>,
    consumer: Mutex<Option<JoinHandle<()>>>,
}

impl SyncSession {
    /// Subscribe to pushed status inserts without loading anything yet.
    pub fn open(query: Arc<dyn QueryInterface>) -> Result<Self, AppError> {
        let state = Arc::new(RwLock::new(SessionState::default()));
        let alive = Arc::new(AtomicBool::new(true));
        let (subscription, payloads) = query.subscribe(CONGESTION_TABLE, ChangeKind::Insert)?;
        let consumer = spawn_push_consumer(payloads, state.clone(), alive.clone());

        Ok(Self {
            query,
            state,
            alive,
            subscription: Mutex::new(Some(subscription)),
            consumer: Mutex::new(Some(consumer)),
        })
    }

    /// Open the session and run the initial load.
    ///
    /// A failed load does not fail startup: the session comes up in [`LoadPhase::Failed`]
    /// and waits for an explicit [`SyncSession::reload`].
    pub async fn start(query: Arc<dyn QueryInterface>) -> Result<Self, AppError> {
        let session = Self::open(query)?;
        if let Err(err) = session.reload().await {
            tracing::warn!("Initial load failed, waiting for reload: {}", err);
        }
        Ok(session)
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Refetch stores, latest statuses and tags, replacing the cached copies wholesale.
    pub async fn reload(&self) -> Result<(), AppError> {
        if !self.is_alive() {
            return Err(AppError::Internal("Session is closed".to_string()));
        }
        self.state.write().await.phase = LoadPhase::Loading;

        let result = load(self.query.as_ref()).await;

        if !self.is_alive() {
            tracing::debug!("Discarding load results for a closed session");
            return Err(AppError::Internal("Session is closed".to_string()));
        }

        let mut state = self.state.write().await;
        match result {
            Ok(data) => {
                state.stores = data.stores;
                state.tags = data.tags;
                state.statuses.apply_bulk(data.statuses);
                state.phase = LoadPhase::Ready;
                Ok(())
            }
            Err(err) => {
                state.phase = LoadPhase::Failed(err.message());
                Err(err)
            }
        }
    }

    pub async fn phase(&self) -> LoadPhase {
        self.state.read().await.phase.clone()
    }

    /// Fails with `DataUnavailable` while the last load is in the failed state.
    pub async fn ensure_available(&self) -> Result<(), AppError> {
        match &self.state.read().await.phase {
            LoadPhase::Failed(message) => Err(AppError::DataUnavailable(message.clone())),
            _ => Ok(()),
        }
    }

    pub async fn view(&self) -> SessionView {
        let state = self.state.read().await;
        SessionView {
            phase: state.phase.clone(),
            stores: state.stores.clone(),
            congestion_statuses: state.statuses.to_vec(),
            hash_tags: state.tags.clone(),
        }
    }

    pub async fn stores(&self) -> Vec<Store> {
        self.state.read().await.stores.clone()
    }

    pub async fn tags(&self) -> Vec<HashTag> {
        self.state.read().await.tags.clone()
    }

    pub async fn statuses(&self) -> Vec<CongestionStatus> {
        self.state.read().await.statuses.to_vec()
    }

    pub async fn current_status(&self, store_id: &str) -> Option<CongestionStatus> {
        self.state.read().await.statuses.get(store_id).cloned()
    }

    /// Cached stores narrowed to those carrying any of `tag_ids`.
    pub async fn filter_by_tags(&self, tag_ids: &[String]) -> Vec<Store> {
        let stores = self.stores().await;
        filter_by_tags(self.query.as_ref(), &stores, tag_ids).await
    }

    pub async fn apply_bulk(&self, statuses: Vec<CongestionStatus>) {
        if self.is_alive() {
            self.state.write().await.statuses.apply_bulk(statuses);
        }
    }

    pub async fn apply_one(&self, status: CongestionStatus) {
        if self.is_alive() {
            self.state.write().await.statuses.apply_one(status);
        }
    }

    /// Report a store's congestion as the user signed in on `auth`.
    ///
    /// Without a user this fails with `AuthRequired` and nothing is written. On success the
    /// stored row becomes the store's current status.
    pub async fn submit_status(
        &self,
        auth: &AuthGate,
        store_id: &str,
        status: CongestionLevel,
    ) -> Result<CongestionStatus, AppError> {
        let user = auth.require_user("report congestion")?;

        let row = self
            .query
            .insert_status(store_id, status, &user)
            .await
            .map_err(|err| err.into_write_failure(STATUS_WRITE_FAILED_MESSAGE))?;
        let created = CongestionStatus::try_from(row).map_err(|err| {
            tracing::warn!(store_id, "Stored status row is invalid: {}", err);
            AppError::WriteFailed(STATUS_WRITE_FAILED_MESSAGE.to_string())
        })?;

        tracing::info!(store_id, status = %created.status, "Congestion status reported");
        self.apply_one(created.clone()).await;
        Ok(created)
    }

    /// Attach a tag to a store as the user signed in on `auth`. Returns the store's
    /// associations.
    pub async fn add_tag(
        &self,
        auth: &AuthGate,
        store_id: &str,
        tag_id: &str,
    ) -> Result<Vec<StoreTag>, AppError> {
        let user = auth.require_user("tag stores")?;
        self.query
            .insert_tag_association(store_id, tag_id, &user)
            .await
            .map_err(|err| err.into_write_failure(TAG_WRITE_FAILED_MESSAGE))?;
        self.store_tags(store_id).await
    }

    /// Remove the caller's own association between a store and a tag.
    pub async fn remove_tag(
        &self,
        auth: &AuthGate,
        store_id: &str,
        tag_id: &str,
    ) -> Result<(), AppError> {
        let user = auth.require_user("untag stores")?;
        self.query
            .delete_tag_association(store_id, tag_id, &user)
            .await
            .map_err(|err| err.into_write_failure(TAG_WRITE_FAILED_MESSAGE))
    }

    pub async fn store_tags(&self, store_id: &str) -> Result<Vec<StoreTag>, AppError> {
        let rows = self.query.store_tag_associations(store_id).await?;
        Ok(rows.into_iter().map(StoreTag::from).collect())
    }

    pub async fn store(&self, id: &str) -> Result<Option<Store>, AppError> {
        Ok(self.query.store_by_id(id).await?.map(Store::from))
    }

    pub async fn stores_by_genre(&self, genre: &str) -> Result<Vec<Store>, AppError> {
        let rows = self.query.stores_by_genre(genre).await?;
        Ok(rows.into_iter().map(Store::from).collect())
    }

    /// The newest stored status for one store, read from the backend rather than the cache.
    pub async fn latest_status_for_store(
        &self,
        store_id: &str,
    ) -> Result<Option<CongestionStatus>, AppError> {
        self.query
            .latest_status_for_store(store_id)
            .await?
            .map(shape_status)
            .transpose()
    }

    pub async fn status_history(
        &self,
        store_id: &str,
        limit: i64,
    ) -> Result<Vec<CongestionStatus>, AppError> {
        self.query
            .status_history(store_id, limit)
            .await?
            .into_iter()
            .map(shape_status)
            .collect()
    }

    /// Tags attached to one store. Counts are not computed on this path and read zero.
    pub async fn tags_for_store(&self, store_id: &str) -> Result<Vec<HashTag>, AppError> {
        let rows = self.query.tags_for_store(store_id).await?;
        Ok(rows.into_iter().map(|row| HashTag::from_row(row, 0)).collect())
    }

    /// Release the subscription and stop the push consumer. Later calls are no-ops.
    pub async fn shutdown(&self) {
        if !self.alive.swap(false, Ordering::SeqCst) {
            return;
        }

        if let Some(subscription) = self.subscription.lock().await.take() {
            subscription.unsubscribe();
        }
        let consumer = self.consumer.lock().await.take();
        if let Some(consumer) = consumer {
            if let Err(err) = consumer.await {
                tracing::warn!("Push consumer ended abnormally: {}", err);
            }
        }

        tracing::info!("Sync session closed");
    }
}

fn shape_status(row: CongestionStatusRow) -> Result<CongestionStatus, AppError> {
    CongestionStatus::try_from(row).map_err(|err| AppError::DataUnavailable(err.to_string()))
}
