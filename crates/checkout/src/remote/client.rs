//! HTTP client for the shop backend's cart and order endpoints.

use std::sync::Arc;

use async_trait::async_trait;
use bookcart_core::{FieldErrors, OrderAck, OrderPayload, ProductId};
use reqwest::header::AUTHORIZATION;
use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::ExposeSecret;
use serde_json::json;
use tracing::{debug, instrument};
use url::Url;

use super::{ClearOutcome, OrderSubmitter, RemoteCart, RemoteCartView, RemoteError};
use crate::auth::SessionAuth;
use crate::config::ShopApiConfig;

const CART_PATH: &str = "shop/cart/";
const CLEAR_CART_PATH: &str = "shop/cart/clear/";
const ADD_ITEM_PATH: &str = "shop/cart/add_item/";
const CREATE_ORDER_PATH: &str = "shop/orders/create_order/";

/// Client for the shop backend.
///
/// Every request carries the session's token, read at request time, so
/// signing in or out through a clone of the session takes effect immediately.
#[derive(Clone)]
pub struct ShopApiClient {
    inner: Arc<ShopApiClientInner>,
}

struct ShopApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    session: SessionAuth,
}

/// Status and body of a response.
struct RawResponse {
    status: StatusCode,
    body: String,
}

impl ShopApiClient {
    /// Create a client for the configured backend.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::Unexpected` if the HTTP client cannot be built.
    pub fn new(config: &ShopApiConfig, session: SessionAuth) -> Result<Self, RemoteError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| RemoteError::Unexpected(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            inner: Arc::new(ShopApiClientInner {
                client,
                base_url: config.base_url.clone(),
                session,
            }),
        })
    }

    /// Base URL every path is joined onto.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Read the server-side cart.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` if the request fails or the body is not a cart.
    #[instrument(skip(self))]
    pub async fn fetch_remote_cart(&self) -> Result<RemoteCartView, RemoteError> {
        let url = self.endpoint(CART_PATH)?;
        let response = self.execute(self.request(Method::GET, url.clone()), &url).await?;

        if !response.status.is_success() {
            return Err(failure(&url, &response));
        }

        serde_json::from_str(&response.body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %snippet(&response.body, 500),
                "Failed to parse remote cart"
            );
            RemoteError::Unexpected(format!("invalid cart response: {e}"))
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, RemoteError> {
        self.inner
            .base_url
            .join(path)
            .map_err(|e| RemoteError::Unexpected(format!("invalid endpoint {path}: {e}")))
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let request = self.inner.client.request(method, url);
        match self.inner.session.token() {
            Some(token) => {
                request.header(AUTHORIZATION, format!("Token {}", token.expose_secret()))
            }
            None => request,
        }
    }

    /// Send a request and read its body.
    ///
    /// Only a failure to get any response is a network error.
    async fn execute(&self, request: RequestBuilder, url: &Url) -> Result<RawResponse, RemoteError> {
        let response = request.send().await.map_err(|e| RemoteError::Network {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            RemoteError::Unexpected(format!("HTTP {status}: failed to read response body: {e}"))
        })?;

        debug!(status = %status, url = %url, "Shop API response");
        Ok(RawResponse { status, body })
    }
}

#[async_trait]
impl RemoteCart for ShopApiClient {
    #[instrument(skip(self))]
    async fn clear_remote_cart(&self) -> Result<ClearOutcome, RemoteError> {
        let url = self.endpoint(CLEAR_CART_PATH)?;
        let response = self
            .execute(self.request(Method::DELETE, url.clone()), &url)
            .await?;

        match response.status {
            status if status.is_success() => Ok(ClearOutcome::Cleared),
            StatusCode::NOT_FOUND => {
                debug!("No remote cart to clear");
                Ok(ClearOutcome::NothingToClear)
            }
            _ => Err(failure(&url, &response)),
        }
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn add_remote_item(
        &self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<(), RemoteError> {
        let url = self.endpoint(ADD_ITEM_PATH)?;
        let body = json!({ "product_id": product_id, "quantity": quantity });
        let response = self
            .execute(self.request(Method::POST, url.clone()).json(&body), &url)
            .await?;

        if response.status.is_success() {
            Ok(())
        } else {
            Err(failure(&url, &response))
        }
    }
}

#[async_trait]
impl OrderSubmitter for ShopApiClient {
    #[instrument(skip(self, payload), fields(payment_method = payload.payment_method.as_str()))]
    async fn create_order(&self, payload: &OrderPayload) -> Result<OrderAck, RemoteError> {
        let url = self.endpoint(CREATE_ORDER_PATH)?;
        let response = self
            .execute(self.request(Method::POST, url.clone()).json(payload), &url)
            .await?;

        if !response.status.is_success() {
            return Err(failure(&url, &response));
        }

        // The order exists once the backend answers 2xx, whatever the body says.
        Ok(serde_json::from_str(&response.body).unwrap_or_else(|e| {
            tracing::warn!(
                error = %e,
                body = %snippet(&response.body, 500),
                "Order created but acknowledgment could not be parsed"
            );
            OrderAck::default()
        }))
    }
}

/// Classify a non-success response.
fn failure(url: &Url, response: &RawResponse) -> RemoteError {
    let status = response.status;
    if status.is_server_error() {
        tracing::error!(
            status = %status,
            url = %url,
            body = %snippet(&response.body, 500),
            "Shop API returned non-success status"
        );
    } else {
        tracing::warn!(
            status = %status,
            url = %url,
            body = %snippet(&response.body, 500),
            "Shop API rejected request"
        );
    }

    let errors = serde_json::from_str::<serde_json::Value>(&response.body)
        .ok()
        .as_ref()
        .and_then(FieldErrors::from_json);

    match errors {
        Some(errors) => RemoteError::Server {
            status: status.as_u16(),
            errors,
        },
        None => RemoteError::Unexpected(format!(
            "HTTP {}: {}",
            status.as_u16(),
            snippet(&response.body, 200)
        )),
    }
}

fn snippet(body: &str, max_chars: usize) -> String {
    body.chars().take(max_chars).collect()
}
