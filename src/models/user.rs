//! Signed-in user identity.

use serde::{Deserialize, Serialize};

/// Identity returned by the authentication provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Request body for `POST /api/auth/session`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInRequest {
    pub user_id: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl From<SignInRequest> for User {
    fn from(request: SignInRequest) -> Self {
        Self {
            id: request.user_id,
            email: request.email,
        }
    }
}

/// Response body for `POST /api/auth/session`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInResponse {
    /// Send back in the `x-session-token` header on later requests
    pub token: String,
    pub user: User,
}
