//! Checkout form data and local validation.
//!
//! Validation is presence-only for delivery fields. Card data additionally
//! gets a minimum length check on the card number. The first violation wins;
//! violations are never aggregated.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Minimum number of characters in a card number.
pub const MIN_CARD_NUMBER_LENGTH: usize = 16;

/// How the customer pays for the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PaymentMethod {
    /// Pay now by credit or debit card.
    #[default]
    #[serde(rename = "card")]
    Card,
    /// Pay in cash when the order is delivered.
    #[serde(rename = "delivery", alias = "cash_on_delivery")]
    CashOnDelivery,
}

impl PaymentMethod {
    /// Name used on the wire.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Card => "card",
            Self::CashOnDelivery => "delivery",
        }
    }

    /// Message shown once an order with this payment method is accepted.
    #[must_use]
    pub const fn success_message(&self) -> &'static str {
        match self {
            Self::Card => "Order created successfully! Payment processed.",
            Self::CashOnDelivery => "Order created successfully! You will pay on delivery.",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the order is shipped and who to contact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliveryInfo {
    pub full_name: String,
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
    pub phone: String,
    pub email: String,
}

impl DeliveryInfo {
    /// Whether every field has a non-blank value.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        [
            &self.full_name,
            &self.address,
            &self.city,
            &self.postal_code,
            &self.country,
            &self.phone,
            &self.email,
        ]
        .into_iter()
        .all(|field| is_present(field))
    }
}

/// Card fields entered on the checkout form.
///
/// Implements `Debug` manually so the card number and CVV never reach logs.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CardDetails {
    pub card_number: String,
    pub card_name: String,
    pub expiry_date: String,
    pub cvv: String,
}

impl fmt::Debug for CardDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CardDetails")
            .field("card_number", &mask_card_number(&self.card_number))
            .field("card_name", &self.card_name)
            .field("expiry_date", &self.expiry_date)
            .field("cvv", &"[REDACTED]")
            .finish()
    }
}

/// The editable checkout form.
///
/// `Default` is the form's initial state: everything blank, paying by card.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckoutForm {
    pub payment_method: PaymentMethod,
    pub delivery: DeliveryInfo,
    pub card: CardDetails,
}

/// A local validation failure. The message is shown to the user as-is.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please fill in all delivery information")]
    MissingDeliveryInfo,
    #[error("Invalid card number")]
    InvalidCardNumber,
    #[error("Cardholder name is required")]
    MissingCardholderName,
    #[error("Expiry date and CVV are required")]
    MissingExpiryOrCvv,
}

/// Form data that passed validation.
///
/// `card` is `Some` exactly when paying by card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedCheckout {
    pub payment_method: PaymentMethod,
    pub delivery: DeliveryInfo,
    pub card: Option<CardDetails>,
}

impl CheckoutForm {
    /// Validate the form.
    ///
    /// Checks run in this order and the first failure is returned:
    /// 1. every delivery field is present
    /// 2. (card) the card number has at least 16 characters
    /// 3. (card) the cardholder name is present
    /// 4. (card) the expiry date and CVV are present
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    pub fn validate(&self) -> Result<ValidatedCheckout, ValidationError> {
        if !self.delivery.is_complete() {
            return Err(ValidationError::MissingDeliveryInfo);
        }

        let card = match self.payment_method {
            PaymentMethod::CashOnDelivery => None,
            PaymentMethod::Card => {
                let card = &self.card;
                if card.card_number.trim().chars().count() < MIN_CARD_NUMBER_LENGTH {
                    return Err(ValidationError::InvalidCardNumber);
                }
                if !is_present(&card.card_name) {
                    return Err(ValidationError::MissingCardholderName);
                }
                if !is_present(&card.expiry_date) || !is_present(&card.cvv) {
                    return Err(ValidationError::MissingExpiryOrCvv);
                }
                Some(card.clone())
            }
        };

        Ok(ValidatedCheckout {
            payment_method: self.payment_method,
            delivery: self.delivery.clone(),
            card,
        })
    }

    /// Put the form back to its initial values.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

fn is_present(value: &str) -> bool {
    !value.trim().is_empty()
}

/// Keep the last four digits of a card number for display.
#[must_use]
pub fn mask_card_number(number: &str) -> String {
    let digits: Vec<char> = number.chars().filter(char::is_ascii_digit).collect();
    let tail: String = digits.iter().skip(digits.len().saturating_sub(4)).collect();
    format!("****{tail}")
}
