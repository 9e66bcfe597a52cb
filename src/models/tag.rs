//! Hashtag and store-tag association models.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A `hash_tags` row as the backend returns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HashTagRow {
    pub id: String,
    pub name: String,
    pub description: String,
    pub color: String,
    pub created_at: String,
}

/// One row of the tag usage aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagCountRow {
    pub tag_id: String,
    pub tag_name: String,
    pub store_count: i64,
}

/// The tag catalog together with its usage aggregate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagCatalogRows {
    pub tags: Vec<HashTagRow>,
    pub counts: Vec<TagCountRow>,
}

/// A user-assignable label used to categorize and filter stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HashTag {
    pub id: String,
    pub name: String,
    pub description: String,
    pub color: String,
    /// Number of distinct stores carrying this tag
    pub count: i64,
}

impl HashTag {
    pub fn from_row(row: HashTagRow, count: i64) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            color: row.color,
            count,
        }
    }
}

impl From<TagCatalogRows> for Vec<HashTag> {
    /// Join each tag with its usage count. Tags absent from the aggregate count zero.
    fn from(catalog: TagCatalogRows) -> Self {
        let counts: HashMap<String, i64> = catalog
            .counts
            .into_iter()
            .map(|c| (c.tag_id, c.store_count))
            .collect();

        catalog
            .tags
            .into_iter()
            .map(|row| {
                let count = counts.get(&row.id).copied().unwrap_or(0);
                HashTag::from_row(row, count)
            })
            .collect()
    }
}

/// A `store_tags` association row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreTagRow {
    pub id: String,
    pub store_id: String,
    pub tag_id: String,
    pub user_id: String,
    pub created_at: String,
}

/// Which user attached which tag to which store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreTag {
    pub id: String,
    pub store_id: String,
    pub tag_id: String,
    pub user_id: String,
    pub created_at: String,
}

impl From<StoreTagRow> for StoreTag {
    fn from(row: StoreTagRow) -> Self {
        Self {
            id: row.id,
            store_id: row.store_id,
            tag_id: row.tag_id,
            user_id: row.user_id,
            created_at: row.created_at,
        }
    }
}

/// Tag definition used for seeding the local backend.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewHashTag {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_color")]
    pub color: String,
}

fn default_color() -> String {
    "#f97316".to_string()
}
