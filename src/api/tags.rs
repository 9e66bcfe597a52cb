//! Tag API endpoints.

use axum::extract::State;

use super::{success, ApiResult};
use crate::models::HashTag;
use crate::AppState;

/// GET /api/tags - Tag catalog with distinct-store counts.
pub async fn list_tags(State(state): State<AppState>) -> ApiResult<Vec<HashTag>> {
    state.session.ensure_available().await?;
    success(state.session.tags().await)
}
