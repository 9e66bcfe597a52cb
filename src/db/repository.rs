//! Database repository implementing the query interface.
//!
//! Status reports are append-only; every successful insert is published on the change feed.

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use sqlx::{Row, SqliteConnection, SqlitePool};

use crate::errors::AppError;
use crate::models::{
    CongestionLevel, CongestionStatusRow, HashTagRow, LatestStatusRow, NewHashTag, NewStore,
    StoreRow, StoreTagRow, TagCatalogRows, TagCountRow, User,
};
use crate::query::{ChangeReceiver, QueryInterface};
use crate::realtime::{
    ChangeEvent, ChangeFeed, ChangeKind, SubscriptionHandle, CONGESTION_TABLE, STORE_TAGS_TABLE,
};

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
    feed: ChangeFeed,
}

impl Repository {
    pub fn new(pool: SqlitePool, feed: ChangeFeed) -> Self {
        Self { pool, feed }
    }

    pub async fn count_stores(&self) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM stores")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("total"))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Insert a store.
    pub async fn create_store(&self, request: &NewStore) -> Result<StoreRow, AppError> {
        let mut conn = self.pool.acquire().await?;
        insert_store(&mut conn, request).await
    }

    /// Insert a hashtag.
    pub async fn create_hash_tag(&self, request: &NewHashTag) -> Result<HashTagRow, AppError> {
        let mut conn = self.pool.acquire().await?;
        insert_hash_tag(&mut conn, request).await
    }

    fn publish_insert<T: serde::Serialize>(&self, table: &str, row: &T) {
        match serde_json::to_value(row) {
            Ok(payload) => self.feed.publish(ChangeEvent::insert(table, payload)),
            Err(e) => tracing::warn!("Failed to encode {} change event: {}", table, e),
        }
    }
}

#[async_trait]
impl QueryInterface for Repository {
    async fn list_stores(&self) -> Result<Vec<StoreRow>, AppError> {
        let rows = sqlx::query(
            "SELECT id, name, address, genre, business_hours, price_range, latitude, longitude, image_url, description, created_at, updated_at FROM stores ORDER BY created_at DESC, rowid DESC"
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(store_from_row).collect())
    }

    async fn latest_status_per_store(&self) -> Result<Vec<LatestStatusRow>, AppError> {
        let rows = sqlx::query(
            r#"
            SELECT c.store_id, c.status, c.created_at, c.user_id
            FROM congestion_statuses c
            WHERE c.rowid = (
                SELECT c2.rowid FROM congestion_statuses c2
                WHERE c2.store_id = c.store_id
                ORDER BY c2.created_at DESC, c2.rowid DESC
                LIMIT 1
            )
            ORDER BY c.store_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| LatestStatusRow {
                store_id: row.get("store_id"),
                status: row.get("status"),
                created_at: row.get("created_at"),
                user_id: row.get("user_id"),
            })
            .collect())
    }

    async fn list_tags_with_counts(&self) -> Result<TagCatalogRows, AppError> {
        let counts = sqlx::query(
            r#"
            SELECT t.id AS tag_id, t.name AS tag_name, COUNT(DISTINCT st.store_id) AS store_count
            FROM hash_tags t
            JOIN store_tags st ON st.tag_id = t.id
            GROUP BY t.id, t.name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let tags = sqlx::query(
            "SELECT id, name, description, color, created_at FROM hash_tags ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(TagCatalogRows {
            tags: tags.iter().map(hash_tag_from_row).collect(),
            counts: counts
                .iter()
                .map(|row| TagCountRow {
                    tag_id: row.get("tag_id"),
                    tag_name: row.get("tag_name"),
                    store_count: row.get("store_count"),
                })
                .collect(),
        })
    }

    async fn stores_for_tag(&self, tag_id: &str) -> Result<Vec<StoreRow>, AppError> {
        let rows = sqlx::query(
            r#"
            SELECT DISTINCT s.id, s.name, s.address, s.genre, s.business_hours, s.price_range,
                   s.latitude, s.longitude, s.image_url, s.description, s.created_at, s.updated_at
            FROM store_tags st
            JOIN stores s ON s.id = st.store_id
            WHERE st.tag_id = ?
            ORDER BY s.created_at DESC, s.id
            "#,
        )
        .bind(tag_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(store_from_row).collect())
    }

    async fn insert_status(
        &self,
        store_id: &str,
        status: CongestionLevel,
        user: &User,
    ) -> Result<CongestionStatusRow, AppError> {
        let row = CongestionStatusRow {
            id: uuid::Uuid::new_v4().to_string(),
            store_id: store_id.to_string(),
            status: status.as_str().to_string(),
            user_id: user.id.clone(),
            created_at: now(),
        };

        sqlx::query(
            "INSERT INTO congestion_statuses (id, store_id, status, user_id, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&row.id)
        .bind(&row.store_id)
        .bind(&row.status)
        .bind(&row.user_id)
        .bind(&row.created_at)
        .execute(&self.pool)
        .await?;

        self.publish_insert(CONGESTION_TABLE, &row);
        Ok(row)
    }

    async fn insert_tag_association(
        &self,
        store_id: &str,
        tag_id: &str,
        user: &User,
    ) -> Result<(), AppError> {
        let row = new_association(store_id, tag_id, &user.id);

        let mut conn = self.pool.acquire().await?;
        if insert_association(&mut conn, &row).await? {
            self.publish_insert(STORE_TAGS_TABLE, &row);
        } else {
            tracing::debug!(store_id, tag_id, "Tag association already present");
        }
        Ok(())
    }

    async fn delete_tag_association(
        &self,
        store_id: &str,
        tag_id: &str,
        user: &User,
    ) -> Result<(), AppError> {
        let result =
            sqlx::query("DELETE FROM store_tags WHERE store_id = ? AND tag_id = ? AND user_id = ?")
                .bind(store_id)
                .bind(tag_id)
                .bind(&user.id)
                .execute(&self.pool)
                .await?;

        tracing::debug!(
            store_id,
            tag_id,
            removed = result.rows_affected(),
            "Tag association delete"
        );
        Ok(())
    }

    fn subscribe(
        &self,
        table: &str,
        kind: ChangeKind,
    ) -> Result<(SubscriptionHandle, ChangeReceiver), AppError> {
        Ok(self.feed.subscribe(table, kind))
    }

    async fn store_by_id(&self, id: &str) -> Result<Option<StoreRow>, AppError> {
        let row = sqlx::query(
            "SELECT id, name, address, genre, business_hours, price_range, latitude, longitude, image_url, description, created_at, updated_at FROM stores WHERE id = ?"
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(store_from_row))
    }

    async fn stores_by_genre(&self, genre: &str) -> Result<Vec<StoreRow>, AppError> {
        let rows = sqlx::query(
            "SELECT id, name, address, genre, business_hours, price_range, latitude, longitude, image_url, description, created_at, updated_at FROM stores WHERE genre = ? ORDER BY created_at DESC, rowid DESC"
        )
        .bind(genre)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(store_from_row).collect())
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
        let rows = sqlx::query(
            "SELECT id, store_id, status, user_id, created_at FROM congestion_statuses WHERE store_id = ? ORDER BY created_at DESC, rowid DESC LIMIT ?",
        )
        .bind(store_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(status_from_row).collect())
    }

    async fn tags_for_store(&self, store_id: &str) -> Result<Vec<HashTagRow>, AppError> {
        let rows = sqlx::query(
            r#"
            SELECT DISTINCT t.id, t.name, t.description, t.color, t.created_at
            FROM store_tags st
            JOIN hash_tags t ON t.id = st.tag_id
            WHERE st.store_id = ?
            ORDER BY t.name
            "#,
        )
        .bind(store_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(hash_tag_from_row).collect())
    }

    async fn store_tag_associations(&self, store_id: &str) -> Result<Vec<StoreTagRow>, AppError> {
        let rows = sqlx::query(
            "SELECT id, store_id, tag_id, user_id, created_at FROM store_tags WHERE store_id = ? ORDER BY created_at, rowid",
        )
        .bind(store_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| StoreTagRow {
                id: row.get("id"),
                store_id: row.get("store_id"),
                tag_id: row.get("tag_id"),
                user_id: row.get("user_id"),
                created_at: row.get("created_at"),
            })
            .collect())
    }
}

/// Fixed-width UTC timestamp so text ordering matches time ordering.
fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

// Writes shared by the repository and seeding, usable inside a transaction

pub(crate) async fn insert_store(
    conn: &mut SqliteConnection,
    request: &NewStore,
) -> Result<StoreRow, AppError> {
    let id = request
        .id
        .clone()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let now = now();

    sqlx::query(
        "INSERT INTO stores (id, name, address, genre, business_hours, price_range, latitude, longitude, image_url, description, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
    )
    .bind(&id)
    .bind(&request.name)
    .bind(&request.address)
    .bind(&request.genre)
    .bind(&request.business_hours)
    .bind(&request.price_range)
    .bind(request.latitude)
    .bind(request.longitude)
    .bind(&request.image_url)
    .bind(&request.description)
    .bind(&now)
    .bind(&now)
    .execute(&mut *conn)
    .await?;

    Ok(StoreRow {
        id,
        name: request.name.clone(),
        address: request.address.clone(),
        genre: request.genre.clone(),
        business_hours: request.business_hours.clone(),
        price_range: request.price_range.clone(),
        latitude: request.latitude,
        longitude: request.longitude,
        image_url: request.image_url.clone(),
        description: request.description.clone(),
        created_at: now.clone(),
        updated_at: now,
    })
}

pub(crate) async fn insert_hash_tag(
    conn: &mut SqliteConnection,
    request: &NewHashTag,
) -> Result<HashTagRow, AppError> {
    let id = request
        .id
        .clone()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let now = now();

    sqlx::query(
        "INSERT INTO hash_tags (id, name, description, color, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(&request.name)
    .bind(&request.description)
    .bind(&request.color)
    .bind(&now)
    .execute(&mut *conn)
    .await?;

    Ok(HashTagRow {
        id,
        name: request.name.clone(),
        description: request.description.clone(),
        color: request.color.clone(),
        created_at: now,
    })
}

/// Insert an association unless the (store, tag, user) triple exists. Returns whether a row
/// was written.
pub(crate) async fn insert_association(
    conn: &mut SqliteConnection,
    row: &StoreTagRow,
) -> Result<bool, AppError> {
    let result = sqlx::query(
        "INSERT INTO store_tags (id, store_id, tag_id, user_id, created_at) VALUES (?, ?, ?, ?, ?) ON CONFLICT (store_id, tag_id, user_id) DO NOTHING",
    )
    .bind(&row.id)
    .bind(&row.store_id)
    .bind(&row.tag_id)
    .bind(&row.user_id)
    .bind(&row.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub(crate) fn new_association(store_id: &str, tag_id: &str, user_id: &str) -> StoreTagRow {
    StoreTagRow {
        id: uuid::Uuid::new_v4().to_string(),
        store_id: store_id.to_string(),
        tag_id: tag_id.to_string(),
        user_id: user_id.to_string(),
        created_at: now(),
    }
}

// Helper functions for row conversion

fn store_from_row(row: &sqlx::sqlite::SqliteRow) -> StoreRow {
    StoreRow {
        id: row.get("id"),
        name: row.get("name"),
        address: row.get("address"),
        genre: row.get("genre"),
        business_hours: row.get("business_hours"),
        price_range: row.get("price_range"),
        latitude: row.get("latitude"),
        longitude: row.get("longitude"),
        image_url: row.get("image_url"),
        description: row.get("description"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn status_from_row(row: &sqlx::sqlite::SqliteRow) -> CongestionStatusRow {
    CongestionStatusRow {
        id: row.get("id"),
        store_id: row.get("store_id"),
        status: row.get("status"),
        user_id: row.get("user_id"),
        created_at: row.get("created_at"),
    }
}

fn hash_tag_from_row(row: &sqlx::sqlite::SqliteRow) -> HashTagRow {
    HashTagRow {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        color: row.get("color"),
        created_at: row.get("created_at"),
    }
}
