//! Application state shared by the checkout entry points.

use std::sync::Arc;

use crate::auth::{Navigator, SessionAuth};
use crate::cart::{CartActions, CartStore};
use crate::config::CheckoutConfig;
use crate::reconciler::Reconciler;
use crate::remote::{RemoteError, ShopApiClient};

/// Reconciler wired to the HTTP client for both remote roles.
pub type ShopReconciler = Reconciler<ShopApiClient, ShopApiClient>;

/// Shared checkout state.
///
/// Cheaply cloneable via `Arc`. Every clone sees the same session, cart and
/// HTTP client.
#[derive(Clone)]
pub struct ShopState {
    inner: Arc<ShopStateInner>,
}

struct ShopStateInner {
    config: CheckoutConfig,
    session: SessionAuth,
    client: ShopApiClient,
    cart: CartStore,
}

impl ShopState {
    /// Create the state from configuration.
    ///
    /// The session starts signed in when a token is configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: CheckoutConfig) -> Result<Self, RemoteError> {
        let session = config
            .api
            .token
            .clone()
            .map_or_else(SessionAuth::new, SessionAuth::with_token);
        let client = ShopApiClient::new(&config.api, session.clone())?;

        Ok(Self {
            inner: Arc::new(ShopStateInner {
                config,
                session,
                client,
                cart: CartStore::new(),
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &CheckoutConfig {
        &self.inner.config
    }

    /// The session used by the gate and the HTTP client.
    #[must_use]
    pub fn session(&self) -> &SessionAuth {
        &self.inner.session
    }

    #[must_use]
    pub fn client(&self) -> &ShopApiClient {
        &self.inner.client
    }

    #[must_use]
    pub fn cart(&self) -> &CartStore {
        &self.inner.cart
    }

    /// Gated cart actions over the shared cart.
    #[must_use]
    pub fn cart_actions(&self, navigator: Arc<dyn Navigator>) -> CartActions {
        CartActions::new(
            self.inner.cart.clone(),
            Arc::new(self.inner.session.clone()),
            navigator,
        )
    }

    /// A reconciler over the shared cart, using the configured redirect delay.
    #[must_use]
    pub fn reconciler(&self, navigator: Arc<dyn Navigator>) -> ShopReconciler {
        Reconciler::new(
            self.inner.cart.clone(),
            Arc::new(self.inner.session.clone()),
            self.inner.client.clone(),
            self.inner.client.clone(),
            navigator,
        )
        .with_redirect_delay(self.inner.config.success_redirect_delay)
    }
}
