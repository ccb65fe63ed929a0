//! Shared, observable local cart.
//!
//! [`CartStore`] is a cheaply cloneable handle: the browsing side and the
//! reconciler hold clones of the same store. Every committed change is
//! published on a `watch` channel so a rendering layer can follow along.
//!
//! While a checkout attempt is pushing the cart to the backend the store is
//! frozen (see [`CartStore::freeze`]) and every mutation is rejected.

mod actions;

pub use actions::{AddOutcome, CartActions};

use std::sync::Arc;

use bookcart_core::{Cart, CartItem, Price, Product, ProductId};
use thiserror::Error;
use tokio::sync::watch;
use tracing::debug;

/// Errors returned by cart mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CartError {
    /// A checkout attempt holds the cart.
    #[error("The cart cannot be changed while a checkout is in progress")]
    CheckoutInProgress,
}

/// What subscribers observe.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartSnapshot {
    /// Current cart contents.
    pub cart: Cart,
    /// Whether a checkout attempt holds the cart.
    pub frozen: bool,
}

/// Shared handle to the local cart.
#[derive(Clone, Debug)]
pub struct CartStore {
    state: Arc<watch::Sender<CartSnapshot>>,
}

impl Default for CartStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CartStore {
    /// Create an empty, unfrozen store.
    #[must_use]
    pub fn new() -> Self {
        let (state, _) = watch::channel(CartSnapshot::default());
        Self {
            state: Arc::new(state),
        }
    }

    /// Add one unit of `product`.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::CheckoutInProgress`] while frozen.
    pub fn add_item(&self, product: &Product) -> Result<(), CartError> {
        self.mutate(|cart| {
            cart.add(product);
            true
        })?;
        debug!(product_id = %product.id, "Added item to cart");
        Ok(())
    }

    /// Remove the line for `id`. Removing an absent product is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::CheckoutInProgress`] while frozen.
    pub fn remove_item(&self, id: ProductId) -> Result<(), CartError> {
        self.mutate(|cart| cart.remove(id))
    }

    /// Set the quantity of `id`; zero or less removes the line.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::CheckoutInProgress`] while frozen.
    pub fn set_quantity(&self, id: ProductId, quantity: i64) -> Result<(), CartError> {
        self.mutate(|cart| cart.set_quantity(id, quantity))
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::CheckoutInProgress`] while frozen.
    pub fn clear(&self) -> Result<(), CartError> {
        self.mutate(Cart::clear)
    }

    /// Sum of `price × quantity`, computed on every call.
    #[must_use]
    pub fn total_price(&self) -> Price {
        self.state.borrow().cart.total_price()
    }

    /// Copy of the lines in insertion order.
    #[must_use]
    pub fn items(&self) -> Vec<CartItem> {
        self.state.borrow().cart.items().to_vec()
    }

    /// Copy of the whole cart.
    #[must_use]
    pub fn snapshot(&self) -> Cart {
        self.state.borrow().cart.clone()
    }

    /// Quantity of `id`, or 0 when absent.
    #[must_use]
    pub fn quantity_of(&self, id: ProductId) -> u32 {
        self.state
            .borrow()
            .cart
            .get(id)
            .map_or(0, |item| item.quantity)
    }

    #[must_use]
    pub fn contains(&self, id: ProductId) -> bool {
        self.state.borrow().cart.contains(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.state.borrow().cart.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.borrow().cart.is_empty()
    }

    /// Total units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.state.borrow().cart.item_count()
    }

    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.state.borrow().frozen
    }

    /// Observe every committed change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CartSnapshot> {
        self.state.subscribe()
    }

    /// Freeze the cart for a checkout attempt.
    ///
    /// The freeze is released when the returned handle is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::CheckoutInProgress`] if already frozen.
    pub fn freeze(&self) -> Result<CartFreeze, CartError> {
        let mut already_frozen = false;
        self.state.send_if_modified(|snapshot| {
            if snapshot.frozen {
                already_frozen = true;
                return false;
            }
            snapshot.frozen = true;
            true
        });

        if already_frozen {
            return Err(CartError::CheckoutInProgress);
        }

        debug!("Cart frozen for checkout");
        Ok(CartFreeze {
            store: self.clone(),
            released: false,
        })
    }

    fn mutate(&self, op: impl FnOnce(&mut Cart) -> bool) -> Result<(), CartError> {
        let mut rejected = false;
        self.state.send_if_modified(|snapshot| {
            if snapshot.frozen {
                rejected = true;
                return false;
            }
            op(&mut snapshot.cart)
        });

        if rejected {
            debug!("Rejected cart change during checkout");
            return Err(CartError::CheckoutInProgress);
        }
        Ok(())
    }

    fn unfreeze(&self, clear: bool) {
        self.state.send_if_modified(|snapshot| {
            let cleared = clear && snapshot.cart.clear();
            let was_frozen = std::mem::replace(&mut snapshot.frozen, false);
            cleared || was_frozen
        });
    }
}

/// Exclusive hold on the cart for one checkout attempt.
///
/// Releases the freeze at most once, either through
/// [`clear_and_release`](Self::clear_and_release) or on drop.
#[derive(Debug)]
pub struct CartFreeze {
    store: CartStore,
    released: bool,
}

impl CartFreeze {
    /// Lines as they were frozen.
    #[must_use]
    pub fn items(&self) -> Vec<CartItem> {
        self.store.items()
    }

    /// Empty the cart and release the freeze in one change.
    pub fn clear_and_release(mut self) {
        self.release(true);
        debug!("Cart cleared after order");
    }

    fn release(&mut self, clear: bool) {
        if !self.released {
            self.released = true;
            self.store.unfreeze(clear);
        }
    }
}

impl Drop for CartFreeze {
    fn drop(&mut self) {
        self.release(false);
    }
}
