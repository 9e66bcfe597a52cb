//! Store endpoints, including per-store tag associations.

use axum::extract::{Path, Query, State};

use super::{error, success, ApiResult};
use crate::auth::ClientAuth;
use crate::errors::AppError;
use crate::models::{HashTag, Store, StoreListQuery, StoreTag};
use crate::AppState;

/// GET /api/stores - Cached stores, narrowed by `tags` (any match) or `genre`.
pub async fn list_stores(
    State(state): State<AppState>,
    Query(query): Query<StoreListQuery>,
) -> ApiResult<Vec<Store>> {
    state.session.ensure_available().await?;

    if let Some(genre) = query.genre.as_deref().filter(|g| !g.trim().is_empty()) {
        return match state.session.stores_by_genre(genre.trim()).await {
            Ok(stores) => success(stores),
            Err(e) => error(e),
        };
    }

    success(state.session.filter_by_tags(&query.tag_ids()).await)
}

/// GET /api/stores/:id - Get a single store.
pub async fn get_store(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Store> {
    match state.session.store(&id).await {
        Ok(Some(store)) => success(store),
        Ok(None) => error(AppError::NotFound(format!("Store {} not found", id))),
        Err(e) => error(e),
    }
}

/// GET /api/stores/:id/tags - Tags attached to a store.
pub async fn list_store_tags(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Vec<HashTag>> {
    match state.session.tags_for_store(&id).await {
        Ok(tags) => success(tags),
        Err(e) => error(e),
    }
}

/// POST /api/stores/:id/tags/:tag_id - Attach a tag as the signed-in user.
pub async fn add_store_tag(
    State(state): State<AppState>,
    auth: ClientAuth,
    Path((id, tag_id)): Path<(String, String)>,
) -> ApiResult<Vec<StoreTag>> {
    match state.session.add_tag(&auth.gate, &id, &tag_id).await {
        Ok(associations) => success(associations),
        Err(e) => error(e),
    }
}

/// DELETE /api/stores/:id/tags/:tag_id - Remove the signed-in user's association.
pub async fn remove_store_tag(
    State(state): State<AppState>,
    auth: ClientAuth,
    Path((id, tag_id)): Path<(String, String)>,
) -> ApiResult<()> {
    match state.session.remove_tag(&auth.gate, &id, &tag_id).await {
        Ok(()) => success(()),
        Err(e) => error(e),
    }
}
