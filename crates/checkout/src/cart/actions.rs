//! Cart actions as the browsing UI triggers them.
//!
//! Adding a product that is not yet in the cart requires a signed-in user;
//! everything else goes straight to the store.

use std::sync::Arc;

use bookcart_core::{Product, ProductId};
use tracing::info;

use super::{CartError, CartStore};
use crate::auth::{AuthGate, Navigator, Route};

/// Result of [`CartActions::add_to_cart`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// The product is in the cart.
    Added,
    /// Nobody is signed in; the user was sent to the login page and the cart
    /// was left alone.
    LoginRequired,
}

/// Gated cart operations for the browsing UI.
#[derive(Clone)]
pub struct CartActions {
    cart: CartStore,
    auth: Arc<dyn AuthGate>,
    navigator: Arc<dyn Navigator>,
}

impl CartActions {
    /// Create cart actions over `cart`.
    #[must_use]
    pub fn new(cart: CartStore, auth: Arc<dyn AuthGate>, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            cart,
            auth,
            navigator,
        }
    }

    /// Add one unit of `product`, redirecting to login if it is new to the
    /// cart and nobody is signed in.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::CheckoutInProgress`] while a checkout holds the cart.
    pub fn add_to_cart(&self, product: &Product) -> Result<AddOutcome, CartError> {
        if !self.cart.contains(product.id) && !self.auth.is_authenticated() {
            info!(product_id = %product.id, "Add to cart requires login");
            self.navigator.navigate(Route::Login);
            return Ok(AddOutcome::LoginRequired);
        }

        self.cart.add_item(product)?;
        Ok(AddOutcome::Added)
    }

    /// Remove a product from the cart.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::CheckoutInProgress`] while a checkout holds the cart.
    pub fn remove_from_cart(&self, id: ProductId) -> Result<(), CartError> {
        self.cart.remove_item(id)
    }

    /// Change the quantity of a product already in the cart.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::CheckoutInProgress`] while a checkout holds the cart.
    pub fn update_quantity(&self, id: ProductId, quantity: i64) -> Result<(), CartError> {
        self.cart.set_quantity(id, quantity)
    }

    /// The store these actions mutate.
    #[must_use]
    pub const fn cart(&self) -> &CartStore {
        &self.cart
    }
}
