//! Outbound order payload and the backend's acknowledgment.

use core::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::checkout::{PaymentMethod, ValidatedCheckout, mask_card_number};
use super::id::OrderId;
use super::price::Price;
use super::status::OrderStatus;

/// Body of the create-order request.
///
/// Card fields are omitted from the JSON entirely unless paying by card.
/// Implements `Debug` manually to redact card data.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct OrderPayload {
    pub payment_method: PaymentMethod,
    pub full_name: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub postal_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_expiry: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_cvv: Option<String>,
}

impl OrderPayload {
    /// Whether any card field will be transmitted.
    #[must_use]
    pub const fn carries_card_data(&self) -> bool {
        self.card_number.is_some() || self.card_expiry.is_some() || self.card_cvv.is_some()
    }
}

impl From<&ValidatedCheckout> for OrderPayload {
    fn from(checkout: &ValidatedCheckout) -> Self {
        let delivery = &checkout.delivery;
        let card = checkout.card.as_ref();
        Self {
            payment_method: checkout.payment_method,
            full_name: delivery.full_name.trim().to_owned(),
            phone: delivery.phone.trim().to_owned(),
            address: delivery.address.trim().to_owned(),
            city: delivery.city.trim().to_owned(),
            postal_code: delivery.postal_code.trim().to_owned(),
            card_number: card.map(|c| c.card_number.trim().to_owned()),
            card_expiry: card.map(|c| c.expiry_date.trim().to_owned()),
            card_cvv: card.map(|c| c.cvv.trim().to_owned()),
        }
    }
}

impl fmt::Debug for OrderPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderPayload")
            .field("payment_method", &self.payment_method)
            .field("full_name", &self.full_name)
            .field("city", &self.city)
            .field(
                "card_number",
                &self.card_number.as_deref().map(mask_card_number),
            )
            .field("card_cvv", &self.card_cvv.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}

/// What the backend returned for an accepted order.
///
/// Every field is optional: any 2xx response means the order exists, even if
/// the body is missing or unexpected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderAck {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub order: Option<OrderSummary>,
}

impl OrderAck {
    /// Server-issued order number, if the backend sent one.
    #[must_use]
    pub fn order_number(&self) -> Option<&str> {
        self.order.as_ref()?.order_number.as_deref()
    }
}

/// Summary of a created order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub id: OrderId,
    #[serde(default)]
    pub order_number: Option<String>,
    #[serde(default)]
    pub total_price: Option<Price>,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub status: Option<OrderStatus>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}
