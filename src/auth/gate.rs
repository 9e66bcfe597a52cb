//! Locally cached sign-in session.

use std::sync::{Arc, RwLock};

use crate::errors::AppError;
use crate::models::User;

/// Holds the user identity the authentication provider last returned.
///
/// Checked synchronously at the moment of each write; nothing is queued for later.
#[derive(Debug, Clone, Default)]
pub struct AuthGate {
    session: Arc<RwLock<Option<User>>>,
}

impl AuthGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_user(&self) -> Option<User> {
        match self.session.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn sign_in(&self, user: User) {
        tracing::info!(user_id = %user.id, "User signed in");
        *self.write_guard() = Some(user);
    }

    /// Clear the session, returning the user that was signed in.
    pub fn sign_out(&self) -> Option<User> {
        let previous = self.write_guard().take();
        if let Some(user) = &previous {
            tracing::info!(user_id = %user.id, "User signed out");
        }
        previous
    }

    /// The signed-in user, or `AuthRequired` naming the refused action.
    pub fn require_user(&self, action: &str) -> Result<User, AppError> {
        self.current_user().ok_or_else(|| {
            tracing::debug!("Refusing {} without a signed-in user", action);
            AppError::AuthRequired(format!("Sign in to {}", action))
        })
    }

    fn write_guard(&self) -> std::sync::RwLockWriteGuard<'_, Option<User>> {
        match self.session.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
