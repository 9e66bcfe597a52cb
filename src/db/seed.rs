//! Initial data loading for an empty database.

use std::path::Path;

use serde::Deserialize;

use super::repository::{insert_association, insert_hash_tag, insert_store, new_association};
use super::Repository;
use crate::errors::AppError;
use crate::models::{NewHashTag, NewStore};

/// Contents of a seed file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedData {
    #[serde(default)]
    pub stores: Vec<NewStore>,
    #[serde(default)]
    pub tags: Vec<NewHashTag>,
    #[serde(default)]
    pub associations: Vec<SeedAssociation>,
}

/// A store-tag association attributed to a user.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedAssociation {
    pub store_id: String,
    pub tag_id: String,
    pub user_id: String,
}

/// Load a JSON seed file into the database.
///
/// Does nothing when stores already exist. Returns the number of stores inserted.
pub async fn seed_from_file(repo: &Repository, path: &Path) -> Result<usize, AppError> {
    if repo.count_stores().await? > 0 {
        tracing::info!("Database already populated, skipping seed");
        return Ok(0);
    }

    let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
        AppError::Internal(format!(
            "Failed to read seed file {}: {}",
            path.display(),
            e
        ))
    })?;
    let data: SeedData = serde_json::from_str(&raw)?;

    apply_seed(repo, &data).await
}

/// Insert seed data in dependency order, all or nothing.
pub async fn apply_seed(repo: &Repository, data: &SeedData) -> Result<usize, AppError> {
    let mut tx = repo.pool().begin().await?;

    for store in &data.stores {
        insert_store(&mut tx, store).await?;
    }
    for tag in &data.tags {
        insert_hash_tag(&mut tx, tag).await?;
    }
    for association in &data.associations {
        let row = new_association(
            &association.store_id,
            &association.tag_id,
            &association.user_id,
        );
        insert_association(&mut tx, &row).await?;
    }

    tx.commit().await?;

    tracing::info!(
        stores = data.stores.len(),
        tags = data.tags.len(),
        associations = data.associations.len(),
        "Seeded database"
    );
    Ok(data.stores.len())
}
