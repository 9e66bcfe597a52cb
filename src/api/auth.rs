//! Sign-in session endpoints.

use axum::{extract::State, Json};

use super::{error, success, ApiResult};
use crate::auth::ClientAuth;
use crate::errors::AppError;
use crate::models::{SignInRequest, SignInResponse, User};
use crate::AppState;

/// GET /api/auth/session - The user signed in on the caller's session token, if any.
pub async fn get_auth_session(auth: ClientAuth) -> ApiResult<Option<User>> {
    success(auth.gate.current_user())
}

/// POST /api/auth/session - Sign in with the identity the provider issued.
///
/// Returns a session token the client sends back in `x-session-token`.
pub async fn sign_in(
    State(state): State<AppState>,
    Json(request): Json<SignInRequest>,
) -> ApiResult<SignInResponse> {
    if request.user_id.trim().is_empty() {
        return error(AppError::Validation("userId is required".to_string()));
    }

    let user = User::from(request);
    let token = state.sign_ins.sign_in(user.clone());
    success(SignInResponse { token, user })
}

/// DELETE /api/auth/session - Sign out. Returns the user that was signed in.
pub async fn sign_out(State(state): State<AppState>, auth: ClientAuth) -> ApiResult<Option<User>> {
    success(auth.token.and_then(|token| state.sign_ins.sign_out(&token)))
}
