//! Remote cart and order submission.
//!
//! The reconciler talks to the backend only through [`RemoteCart`] and
//! [`OrderSubmitter`]; [`ShopApiClient`] implements both over HTTP.

mod client;

pub use client::ShopApiClient;

use async_trait::async_trait;
use bookcart_core::{FieldErrors, OrderAck, OrderPayload, Price, ProductId};
use serde::Deserialize;
use thiserror::Error;

/// Failure of a single remote call.
#[derive(Debug, Clone, Error)]
pub enum RemoteError {
    /// No response was received.
    #[error("request to {url} failed: {message}")]
    Network { url: String, message: String },

    /// Non-success response with a structured field-error body.
    #[error("HTTP {status}: {errors}")]
    Server { status: u16, errors: FieldErrors },

    /// Anything else: unreadable or unstructured responses.
    #[error("{0}")]
    Unexpected(String),
}

/// Outcome of clearing the server-side cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearOutcome {
    /// Items were removed (or the cart was already empty).
    Cleared,
    /// The user has no server-side cart yet.
    NothingToClear,
}

/// The server-side cart of the current session.
#[async_trait]
pub trait RemoteCart: Send + Sync {
    /// Remove every line from the server-side cart.
    async fn clear_remote_cart(&self) -> Result<ClearOutcome, RemoteError>;

    /// Append `quantity` units of `product_id`, incrementing an existing line.
    async fn add_remote_item(&self, product_id: ProductId, quantity: u32)
    -> Result<(), RemoteError>;
}

/// Creates orders from the server-side cart.
#[async_trait]
pub trait OrderSubmitter: Send + Sync {
    async fn create_order(&self, payload: &OrderPayload) -> Result<OrderAck, RemoteError>;
}

/// Server-side cart as returned by `GET shop/cart/`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RemoteCartView {
    #[serde(default)]
    pub items: Vec<RemoteCartLine>,
    #[serde(default)]
    pub total_price: Option<Price>,
    #[serde(default)]
    pub total_items: Option<u64>,
}

/// One line of the server-side cart.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteCartLine {
    pub product: RemoteProduct,
    pub quantity: u32,
    #[serde(default)]
    pub subtotal: Option<Price>,
}

/// Product as embedded in a server-side cart line.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteProduct {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub price: Option<Price>,
}
