//! Identity lookup.

use std::sync::{PoisonError, RwLock};

use log::info;

/// Source of the signed-in user's id.
pub trait AuthProvider: Send + Sync {
    fn current_user(&self) -> Option<String>;
}

/// In-process sign-in state.
#[derive(Debug, Default)]
pub struct SessionAuth {
    user: RwLock<Option<String>>,
}

impl SessionAuth {
    /// Nobody signed in.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signed_in(user: impl Into<String>) -> Self {
        Self {
            user: RwLock::new(Some(user.into())),
        }
    }

    pub fn sign_in(&self, user: impl Into<String>) {
        let user = user.into();
        info!("Signed in as {}", user);
        *self.user.write().unwrap_or_else(PoisonError::into_inner) = Some(user);
    }

    pub fn sign_out(&self) {
        info!("Signed out");
        *self.user.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl AuthProvider for SessionAuth {
    fn current_user(&self) -> Option<String> {
        self.user
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
