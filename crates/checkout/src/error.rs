//! Checkout error taxonomy with Sentry integration.
//!
//! Every way a checkout attempt can end without an order is a
//! [`CheckoutError`]. Its `Display` output is the message shown to the user.
//! Failures the user cannot fix (network, unexpected) are captured to Sentry
//! by [`CheckoutError::report`].

use bookcart_core::{CheckoutAttemptId, FieldErrors, ProductId, ValidationError};
use thiserror::Error;

use crate::remote::RemoteError;

/// Message shown when the backend could not be reached.
pub const NETWORK_ERROR_MESSAGE: &str =
    "Unable to reach the shop server. Check your connection and try again.";

/// The remote step a failure happened in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStage {
    /// Emptying the server-side cart.
    ClearCart,
    /// Pushing one local line to the server-side cart.
    SyncItem {
        /// Product being synchronized.
        product_id: ProductId,
        /// Display name of that product.
        name: String,
    },
    /// Creating the order from the server-side cart.
    CreateOrder,
}

impl std::fmt::Display for SyncStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ClearCart => f.write_str("clearing remote cart"),
            Self::SyncItem { product_id, name } => {
                write!(f, "adding \"{name}\" (product {product_id}) to remote cart")
            }
            Self::CreateOrder => f.write_str("creating order"),
        }
    }
}

/// Why a checkout attempt did not produce an order.
#[derive(Debug, Clone, Error)]
pub enum CheckoutError {
    /// The local cart has no lines.
    #[error("Your cart is empty")]
    EmptyCart,

    /// No user is signed in.
    #[error("Please log in to place an order")]
    NotAuthenticated,

    /// Another attempt is still running.
    #[error("A checkout is already in progress")]
    AlreadyInProgress,

    /// The form failed local validation. No request was sent.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The backend rejected a request with field errors.
    #[error("{errors}")]
    RemoteValidation {
        stage: SyncStage,
        status: u16,
        errors: FieldErrors,
    },

    /// No response was received.
    #[error("{}", NETWORK_ERROR_MESSAGE)]
    Network { stage: SyncStage, message: String },

    /// Anything else, shown with its raw message.
    #[error("{message}")]
    Unexpected { stage: SyncStage, message: String },
}

impl CheckoutError {
    /// Classify a remote failure that happened during `stage`.
    #[must_use]
    pub fn from_remote(stage: SyncStage, error: RemoteError) -> Self {
        match error {
            RemoteError::Server { status, errors } => Self::RemoteValidation {
                stage,
                status,
                errors,
            },
            RemoteError::Network { url, message } => Self::Network {
                stage,
                message: format!("{url}: {message}"),
            },
            RemoteError::Unexpected(message) => Self::Unexpected { stage, message },
        }
    }

    /// The remote step that failed, if the failure was remote.
    #[must_use]
    pub const fn stage(&self) -> Option<&SyncStage> {
        match self {
            Self::RemoteValidation { stage, .. }
            | Self::Network { stage, .. }
            | Self::Unexpected { stage, .. } => Some(stage),
            _ => None,
        }
    }

    /// The product whose synchronization failed, if any.
    #[must_use]
    pub const fn failed_product(&self) -> Option<ProductId> {
        match self.stage() {
            Some(SyncStage::SyncItem { product_id, .. }) => Some(*product_id),
            _ => None,
        }
    }

    /// Whether this failure ended an attempt that had reached the network.
    ///
    /// Only these move the reconciler to `Failed`; the others leave it idle.
    #[must_use]
    pub const fn is_remote(&self) -> bool {
        self.stage().is_some()
    }

    /// Message shown to the user. May span several lines.
    #[must_use]
    pub fn user_message(&self) -> String {
        self.to_string()
    }

    /// Log the failure and capture it to Sentry when it is not the user's doing.
    pub fn report(&self, attempt: CheckoutAttemptId) {
        match self {
            Self::Network { stage, message } => {
                let event_id = sentry::capture_error(self);
                tracing::error!(
                    attempt = %attempt,
                    stage = %stage,
                    error = %message,
                    sentry_event_id = %event_id,
                    "Checkout failed: shop server unreachable"
                );
            }
            Self::Unexpected { stage, message } => {
                let event_id = sentry::capture_error(self);
                tracing::error!(
                    attempt = %attempt,
                    stage = %stage,
                    error = %message,
                    sentry_event_id = %event_id,
                    "Checkout failed unexpectedly"
                );
            }
            Self::RemoteValidation {
                stage,
                status,
                errors,
            } => {
                tracing::warn!(
                    attempt = %attempt,
                    stage = %stage,
                    status,
                    fields = ?errors.fields().collect::<Vec<_>>(),
                    "Checkout rejected by shop server"
                );
            }
            other => {
                tracing::info!(attempt = %attempt, reason = %other, "Checkout not started");
            }
        }
    }
}

/// Add a breadcrumb for a checkout step.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of steps
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
