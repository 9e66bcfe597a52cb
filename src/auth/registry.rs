//! Per-client sign-in sessions for the HTTP API.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::{Arc, RwLock};

use axum::{extract::FromRequestParts, http::request::Parts};

use super::AuthGate;
use crate::models::User;
use crate::AppState;

/// Header carrying the token returned by `POST /api/auth/session`.
pub const SESSION_TOKEN_HEADER: &str = "x-session-token";

/// Sign-in gates keyed by session token. Each client signs in separately.
#[derive(Debug, Clone, Default)]
pub struct SignInRegistry {
    gates: Arc<RwLock<HashMap<String, AuthGate>>>,
}

impl SignInRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new session for `user` and return its token.
    pub fn sign_in(&self, user: User) -> String {
        let token = uuid::Uuid::new_v4().simple().to_string();
        let gate = AuthGate::new();
        gate.sign_in(user);

        let mut gates = match self.gates.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        gates.insert(token.clone(), gate);
        token
    }

    /// The gate for `token`. Missing or unknown tokens get a gate with nobody signed in.
    pub fn gate(&self, token: Option<&str>) -> AuthGate {
        let gates = match self.gates.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        token
            .and_then(|t| gates.get(t))
            .cloned()
            .unwrap_or_default()
    }

    /// Close the session for `token`, returning the user that was signed in.
    pub fn sign_out(&self, token: &str) -> Option<User> {
        let removed = match self.gates.write() {
            Ok(mut guard) => guard.remove(token),
            Err(poisoned) => poisoned.into_inner().remove(token),
        };
        removed.and_then(|gate| gate.sign_out())
    }
}

/// The calling client's sign-in state, resolved from [`SESSION_TOKEN_HEADER`].
pub struct ClientAuth {
    pub token: Option<String>,
    pub gate: AuthGate,
}

impl FromRequestParts<AppState> for ClientAuth {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(SESSION_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let gate = state.sign_ins.gate(token.as_deref());
        Ok(ClientAuth { token, gate })
    }
}
