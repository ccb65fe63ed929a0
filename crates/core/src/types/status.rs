//! Status enums for checkout attempts and orders.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Where a checkout attempt currently stands.
///
/// ```text
/// Idle → Validating → SyncingCart → CreatingOrder → Succeeded
///            │             │              │
///            ▼             └──────────────┴──────→ Failed
///          Idle (invalid form)
/// ```
///
/// Terminal states carry the message shown to the user, so a state can never
/// be both succeeded and failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CheckoutState {
    /// No attempt in flight.
    #[default]
    Idle,
    /// Checking the form locally.
    Validating,
    /// Clearing the remote cart and pushing local lines one at a time.
    SyncingCart {
        /// Lines already accepted by the backend.
        synced: usize,
        /// Lines in the local cart.
        total: usize,
    },
    /// Waiting for the backend to create the order.
    CreatingOrder,
    /// The order was accepted.
    Succeeded { message: String },
    /// The attempt was aborted by a remote error.
    Failed { message: String },
}

impl CheckoutState {
    /// Whether an attempt is currently running.
    #[must_use]
    pub const fn is_working(&self) -> bool {
        matches!(
            self,
            Self::Validating | Self::SyncingCart { .. } | Self::CreatingOrder
        )
    }

    /// Whether the state is `Succeeded` or `Failed`.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded { .. } | Self::Failed { .. })
    }

    /// Short state name without data.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Validating => "validating",
            Self::SyncingCart { .. } => "syncing_cart",
            Self::CreatingOrder => "creating_order",
            Self::Succeeded { .. } => "succeeded",
            Self::Failed { .. } => "failed",
        }
    }

    /// The user-facing message of a terminal state.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Succeeded { message } | Self::Failed { message } => Some(message),
            _ => None,
        }
    }
}

impl fmt::Display for CheckoutState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SyncingCart { synced, total } => write!(f, "syncing_cart ({synced}/{total})"),
            other => f.write_str(other.name()),
        }
    }
}

/// Order status as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    /// Any status this client does not know about.
    #[serde(other)]
    Other,
}
