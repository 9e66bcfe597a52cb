//! Store model and its source row.

use serde::{Deserialize, Serialize};

/// A `stores` row as the backend returns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreRow {
    pub id: String,
    pub name: String,
    pub address: String,
    pub genre: String,
    pub business_hours: String,
    pub price_range: String,
    pub latitude: f64,
    pub longitude: f64,
    pub image_url: String,
    pub description: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A venue whose congestion users report on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Store {
    pub id: String,
    pub name: String,
    pub address: String,
    pub genre: String,
    pub business_hours: String,
    pub price_range: String,
    pub latitude: f64,
    pub longitude: f64,
    pub image_url: String,
    pub description: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<StoreRow> for Store {
    fn from(row: StoreRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            address: row.address,
            genre: row.genre,
            business_hours: row.business_hours,
            price_range: row.price_range,
            latitude: row.latitude,
            longitude: row.longitude,
            image_url: row.image_url,
            description: row.description.unwrap_or_default(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Store definition used for seeding the local backend.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStore {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub address: String,
    pub genre: String,
    pub business_hours: String,
    pub price_range: String,
    pub latitude: f64,
    pub longitude: f64,
    pub image_url: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Query parameters for `GET /api/stores`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreListQuery {
    /// Comma-separated tag ids
    #[serde(default)]
    pub tags: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
}

impl StoreListQuery {
    /// Selected tag ids, ignoring blanks.
    pub fn tag_ids(&self) -> Vec<String> {
        self.tags
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect()
    }
}
