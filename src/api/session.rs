//! Session view endpoints.

use axum::extract::State;

use super::{error, success, ApiResult};
use crate::sync::SessionView;
use crate::AppState;

/// GET /api/session - Load phase plus every cached collection.
pub async fn get_session(State(state): State<AppState>) -> ApiResult<SessionView> {
    success(state.session.view().await)
}

/// POST /api/session/reload - Refetch everything from the backend.
pub async fn reload_session(State(state): State<AppState>) -> ApiResult<SessionView> {
    match state.session.reload().await {
        Ok(()) => success(state.session.view().await),
        Err(e) => error(e),
    }
}
