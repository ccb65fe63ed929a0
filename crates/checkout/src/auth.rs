//! Authentication gate and navigation seam.
//!
//! The session itself (login, token storage) belongs to the host
//! application. This module only answers "is somebody signed in" and carries
//! the token the remote client needs.

use std::sync::{Arc, PoisonError, RwLock};

use secrecy::SecretString;

/// Answers whether a user is signed in.
pub trait AuthGate: Send + Sync {
    fn is_authenticated(&self) -> bool;
}

/// Places the presentation layer can be sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// The login page.
    Login,
    /// The page shown after an order was placed.
    OrderComplete,
}

impl Route {
    /// Path of the route in the web frontend.
    #[must_use]
    pub const fn path(&self) -> &'static str {
        match self {
            Self::Login => "/login",
            Self::OrderComplete => "/success",
        }
    }
}

/// Performs navigation on behalf of the core.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

/// Session backed by the backend's API token.
///
/// Clones share the same session, so signing out through one clone is seen
/// by the gate and the remote client alike.
#[derive(Clone, Default)]
pub struct SessionAuth {
    token: Arc<RwLock<Option<SecretString>>>,
}

impl std::fmt::Debug for SessionAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionAuth")
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}

impl SessionAuth {
    /// A signed-out session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A session signed in with `token`.
    #[must_use]
    pub fn with_token(token: SecretString) -> Self {
        let session = Self::new();
        session.sign_in(token);
        session
    }

    /// Replace the current token.
    pub fn sign_in(&self, token: SecretString) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token);
    }

    /// Forget the current token.
    pub fn sign_out(&self) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// The current token, if signed in.
    #[must_use]
    pub fn token(&self) -> Option<SecretString> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl AuthGate for SessionAuth {
    fn is_authenticated(&self) -> bool {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}
