//! The query interface the sync layer is written against.
//!
//! Implemented by [`crate::db::Repository`] for the local SQLite backend and by an
//! in-memory fake in tests. All rows come back in their snake_case source shape; turning
//! them into application models is the caller's job.

#[cfg(test)]
pub mod fake;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::errors::AppError;
use crate::models::{
    CongestionLevel, CongestionStatusRow, HashTagRow, LatestStatusRow, StoreRow, StoreTagRow,
    TagCatalogRows, User,
};
use crate::realtime::{ChangeKind, SubscriptionHandle};

/// Row payloads delivered by a subscription, in arrival order.
pub type ChangeReceiver = mpsc::Receiver<serde_json::Value>;

#[async_trait]
pub trait QueryInterface: Send + Sync {
    /// All stores, newest first.
    async fn list_stores(&self) -> Result<Vec<StoreRow>, AppError>;

    /// Exactly one row per store that has any status: its most recent one.
    async fn latest_status_per_store(&self) -> Result<Vec<LatestStatusRow>, AppError>;

    /// Tag catalog plus the distinct-store count per tag.
    async fn list_tags_with_counts(&self) -> Result<TagCatalogRows, AppError>;

    /// Stores associated with a tag, each at most once.
    async fn stores_for_tag(&self, tag_id: &str) -> Result<Vec<StoreRow>, AppError>;

    /// Append a status report on behalf of `user`. Returns the stored row.
    async fn insert_status(
        &self,
        store_id: &str,
        status: CongestionLevel,
        user: &User,
    ) -> Result<CongestionStatusRow, AppError>;

    /// Attach a tag to a store. Repeating an existing (store, tag, user) triple is a no-op.
    async fn insert_tag_association(
        &self,
        store_id: &str,
        tag_id: &str,
        user: &User,
    ) -> Result<(), AppError>;

    /// Detach a tag from a store, only touching the association `user` created.
    async fn delete_tag_association(
        &self,
        store_id: &str,
        tag_id: &str,
        user: &User,
    ) -> Result<(), AppError>;

    /// Subscribe to row changes of one kind on one table.
    fn subscribe(
        &self,
        table: &str,
        kind: ChangeKind,
    ) -> Result<(SubscriptionHandle, ChangeReceiver), AppError>;

    async fn store_by_id(&self, id: &str) -> Result<Option<StoreRow>, AppError>;

    /// Stores of one genre, newest first.
    async fn stores_by_genre(&self, genre: &str) -> Result<Vec<StoreRow>, AppError>;

    async fn latest_status_for_store(
        &self,
        store_id: &str,
    ) -> Result<Option<CongestionStatusRow>, AppError>;

    /// Up to `limit` statuses for a store, newest first.
    async fn status_history(
        &self,
        store_id: &str,
        limit: i64,
    ) -> Result<Vec<CongestionStatusRow>, AppError>;

    async fn tags_for_store(&self, store_id: &str) -> Result<Vec<HashTagRow>, AppError>;

    async fn store_tag_associations(&self, store_id: &str) -> Result<Vec<StoreTagRow>, AppError>;
}
