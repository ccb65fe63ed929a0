//! Core types for Bookcart.
//!
//! This module provides type-safe wrappers and pure logic for the cart and
//! checkout domain.

pub mod cart;
pub mod checkout;
pub mod field_errors;
pub mod id;
pub mod order;
pub mod price;
pub mod status;

pub use cart::{Cart, CartItem, Product};
pub use checkout::{
    CardDetails, CheckoutForm, DeliveryInfo, MIN_CARD_NUMBER_LENGTH, PaymentMethod,
    ValidatedCheckout, ValidationError,
};
pub use field_errors::FieldErrors;
pub use id::*;
pub use order::{OrderAck, OrderPayload, OrderSummary};
pub use price::{Price, PriceError};
pub use status::{CheckoutState, OrderStatus};
