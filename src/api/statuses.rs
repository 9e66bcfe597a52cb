//! Congestion status endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};

use super::{error, success, ApiResult};
use crate::auth::ClientAuth;
use crate::errors::AppError;
use crate::models::{CongestionStatus, HistoryQuery, SubmitStatusRequest};
use crate::AppState;

/// GET /api/statuses - Current status of every store that has one.
pub async fn list_statuses(State(state): State<AppState>) -> ApiResult<Vec<CongestionStatus>> {
    state.session.ensure_available().await?;
    success(state.session.statuses().await)
}

/// GET /api/stores/:id/status - Current status from the live cache.
pub async fn get_current_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Option<CongestionStatus>> {
    state.session.ensure_available().await?;
    success(state.session.current_status(&id).await)
}

/// POST /api/stores/:id/status - Report congestion as the signed-in user.
pub async fn submit_status(
    State(state): State<AppState>,
    auth: ClientAuth,
    Path(id): Path<String>,
    Json(request): Json<SubmitStatusRequest>,
) -> ApiResult<CongestionStatus> {
    match state.session.submit_status(&auth.gate, &id, request.status).await {
        Ok(status) => success(status),
        Err(e) => error(e),
    }
}

/// GET /api/stores/:id/status/history - Recent reports, newest first.
pub async fn get_status_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Vec<CongestionStatus>> {
    let limit = query.limit.unwrap_or(state.config.history_limit);
    if limit < 1 {
        return error(AppError::Validation(
            "limit must be a positive integer".to_string(),
        ));
    }

    match state.session.status_history(&id, limit).await {
        Ok(history) => success(history),
        Err(e) => error(e),
    }
}
