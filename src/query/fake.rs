//! In-memory [`QueryInterface`] for unit tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use super::{ChangeReceiver, QueryInterface};
use crate::errors::AppError;
use crate::models::{
    CongestionLevel, CongestionStatusRow, HashTagRow, LatestStatusRow, StoreRow, StoreTagRow,
    TagCatalogRows, TagCountRow, User,
};
use crate::realtime::{ChangeEvent, ChangeFeed, ChangeKind, SubscriptionHandle, CONGESTION_TABLE};

pub struct FakeQuery {
    pub stores: Mutex<Vec<StoreRow>>,
    pub latest: Mutex<Vec<LatestStatusRow>>,
    pub catalog: Mutex<TagCatalogRows>,
    pub associations: Mutex<Vec<StoreTagRow>>,
    pub inserted: Mutex<Vec<CongestionStatusRow>>,
    pub insert_calls: AtomicUsize,
    pub feed: ChangeFeed,
    failing: Mutex<HashSet<&'static str>>,
    hold_stores: Mutex<Option<Arc<Notify>>>,
}

impl FakeQuery {
    pub fn new() -> Self {
        Self {
            stores: Mutex::new(Vec::new()),
            latest: Mutex::new(Vec::new()),
            catalog: Mutex::new(TagCatalogRows::default()),
            associations: Mutex::new(Vec::new()),
            inserted: Mutex::new(Vec::new()),
            insert_calls: AtomicUsize::new(0),
            feed: ChangeFeed::new(64),
            failing: Mutex::new(HashSet::new()),
            hold_stores: Mutex::new(None),
        }
    }

    /// Three stores A, B, C; A is empty, B is full, C has no report;
    /// tag1 is on A and B, tag2 on C.
    pub fn scenario() -> Self {
        let fake = Self::new();
        *fake.stores.lock().unwrap() = vec![store("C"), store("B"), store("A")];
        *fake.latest.lock().unwrap() = vec![latest("A", "empty"), latest("B", "full")];
        *fake.catalog.lock().unwrap() = TagCatalogRows {
            tags: vec![tag("tag1"), tag("tag2")],
            counts: vec![count("tag1", 2), count("tag2", 1)],
        };
        *fake.associations.lock().unwrap() = vec![
            association("A", "tag1", "seed"),
            association("B", "tag1", "seed"),
            association("C", "tag2", "seed"),
        ];
        fake
    }

    /// Make every call to `op` fail with a database error.
    pub fn fail(&self, op: &'static str) {
        self.failing.lock().unwrap().insert(op);
    }

    pub fn recover(&self, op: &'static str) {
        self.failing.lock().unwrap().remove(op);
    }

    /// Block `list_stores` until the returned notifier fires.
    pub fn hold_store_listing(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.hold_stores.lock().unwrap() = Some(notify.clone());
        notify
    }

    pub fn insert_count(&self) -> usize {
        self.insert_calls.load(Ordering::SeqCst)
    }

    fn check(&self, op: &'static str) -> Result<(), AppError> {
        if self.failing.lock().unwrap().contains(op) {
            return Err(AppError::Database(format!("{} unavailable", op)));
        }
        Ok(())
    }

    fn store_ids_for_tag(&self, tag_id: &str) -> Vec<String> {
        self.associations
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.tag_id == tag_id)
            .map(|a| a.store_id.clone())
            .collect()
    }
}

#[async_trait]
impl QueryInterface for FakeQuery {
    async fn list_stores(&self) -> Result<Vec<StoreRow>, AppError> {
        let hold = self.hold_stores.lock().unwrap().clone();
        if let Some(notify) = hold {
            notify.notified().await;
        }
        self.check("list_stores")?;
        Ok(self.stores.lock().unwrap().clone())
    }

    async fn latest_status_per_store(&self) -> Result<Vec<LatestStatusRow>, AppError> {
        self.check("latest_status_per_store")?;
        Ok(self.latest.lock().unwrap().clone())
    }

    async fn list_tags_with_counts(&self) -> Result<TagCatalogRows, AppError> {
        self.check("list_tags_with_counts")?;
        Ok(self.catalog.lock().unwrap().clone())
    }

    async fn stores_for_tag(&self, tag_id: &str) -> Result<Vec<StoreRow>, AppError> {
        self.check("stores_for_tag")?;
        let ids = self.store_ids_for_tag(tag_id);
        let stores = self.stores.lock().unwrap();
        Ok(ids
            .iter()
            .filter_map(|id| stores.iter().find(|s| &s.id == id).cloned())
            .collect())
    }

    async fn insert_status(
        &self,
        store_id: &str,
        status: CongestionLevel,
        user: &User,
    ) -> Result<CongestionStatusRow, AppError> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        self.check("insert_status")?;
        let mut inserted = self.inserted.lock().unwrap();
        let row = CongestionStatusRow {
            id: format!("c{}", inserted.len() + 1),
            store_id: store_id.to_string(),
            status: status.as_str().to_string(),
            user_id: user.id.clone(),
            created_at: format!("2024-06-01T00:00:{:02}.000000Z", inserted.len()),
        };
        inserted.push(row.clone());
        self.feed.publish(ChangeEvent::insert(
            CONGESTION_TABLE,
            serde_json::to_value(&row).unwrap(),
        ));
        Ok(row)
    }

    async fn insert_tag_association(
        &self,
        store_id: &str,
        tag_id: &str,
        user: &User,
    ) -> Result<(), AppError> {
        self.check("insert_tag_association")?;
        let mut associations = self.associations.lock().unwrap();
        let exists = associations
            .iter()
            .any(|a| a.store_id == store_id && a.tag_id == tag_id && a.user_id == user.id);
        if !exists {
            associations.push(association(store_id, tag_id, &user.id));
        }
        Ok(())
    }

    async fn delete_tag_association(
        &self,
        store_id: &str,
        tag_id: &str,
        user: &User,
    ) -> Result<(), AppError> {
        self.check("delete_tag_association")?;
        self.associations
            .lock()
            .unwrap()
            .retain(|a| !(a.store_id == store_id && a.tag_id == tag_id && a.user_id == user.id));
        Ok(())
    }

    fn subscribe(
        &self,
        table: &str,
        kind: ChangeKind,
    ) -> Result<(SubscriptionHandle, ChangeReceiver), AppError> {
        self.check("subscribe")?;
        Ok(self.feed.subscribe(table, kind))
    }

    async fn store_by_id(&self, id: &str) -> Result<Option<StoreRow>, AppError> {
        self.check("store_by_id")?;
        Ok(self.stores.lock().unwrap().iter().find(|s| s.id == id).cloned())
    }

    async fn stores_by_genre(&self, genre: &str) -> Result<Vec<StoreRow>, AppError> {
        self.check("stores_by_genre")?;
        Ok(self
            .stores
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.genre == genre)
            .cloned()
            .collect())
    }

    async fn latest_status_for_store(
        &self,
        store_id: &str,
    ) -> Result<Option<CongestionStatusRow>, AppError> {
        Ok(self.status_history(store_id, 1).await?.into_iter().next())
    }

    async fn status_history(
        &self,
        store_id: &str,
        limit: i64,
    ) -> Result<Vec<CongestionStatusRow>, AppError> {
        self.check("status_history")?;
        Ok(self
            .inserted
            .lock()
            .unwrap()
            .iter()
            .rev()
            .filter(|s| s.store_id == store_id)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn tags_for_store(&self, store_id: &str) -> Result<Vec<HashTagRow>, AppError> {
        self.check("tags_for_store")?;
        let tag_ids: Vec<String> = self
            .associations
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.store_id == store_id)
            .map(|a| a.tag_id.clone())
            .collect();
        let catalog = self.catalog.lock().unwrap();
        Ok(catalog
            .tags
            .iter()
            .filter(|t| tag_ids.contains(&t.id))
            .cloned()
            .collect())
    }

    async fn store_tag_associations(&self, store_id: &str) -> Result<Vec<StoreTagRow>, AppError> {
        self.check("store_tag_associations")?;
        Ok(self
            .associations
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.store_id == store_id)
            .cloned()
            .collect())
    }
}

pub fn store(id: &str) -> StoreRow {
    StoreRow {
        id: id.to_string(),
        name: format!("Store {}", id),
        address: format!("{} Street", id),
        genre: "cafe".to_string(),
        business_hours: "9:00-18:00".to_string(),
        price_range: "¥1000".to_string(),
        latitude: 35.0,
        longitude: 139.0,
        image_url: format!("https://img.example/{}.jpg", id),
        description: None,
        created_at: "2024-05-01T00:00:00.000000Z".to_string(),
        updated_at: "2024-05-01T00:00:00.000000Z".to_string(),
    }
}

pub fn latest(store_id: &str, status: &str) -> LatestStatusRow {
    LatestStatusRow {
        store_id: store_id.to_string(),
        status: status.to_string(),
        created_at: "2024-05-01T09:00:00.000000Z".to_string(),
        user_id: "seed".to_string(),
    }
}

fn tag(id: &str) -> HashTagRow {
    HashTagRow {
        id: id.to_string(),
        name: format!("#{}", id),
        description: String::new(),
        color: "#f97316".to_string(),
        created_at: "2024-05-01T00:00:00.000000Z".to_string(),
    }
}

fn count(tag_id: &str, store_count: i64) -> TagCountRow {
    TagCountRow {
        tag_id: tag_id.to_string(),
        tag_name: format!("#{}", tag_id),
        store_count,
    }
}

fn association(store_id: &str, tag_id: &str, user_id: &str) -> StoreTagRow {
    StoreTagRow {
        id: format!("{}:{}:{}", store_id, tag_id, user_id),
        store_id: store_id.to_string(),
        tag_id: tag_id.to_string(),
        user_id: user_id.to_string(),
        created_at: "2024-05-01T00:00:00.000000Z".to_string(),
    }
}
