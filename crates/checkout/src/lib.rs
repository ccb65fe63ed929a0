//! Bookcart checkout library.
//!
//! Holds the client-side cart and reconciles it with the shop backend before
//! placing an order.
//!
//! # Architecture
//!
//! - [`cart::CartStore`] - shared, observable local cart (no I/O)
//! - [`auth`] - authentication gate and navigation seam
//! - [`remote`] - remote cart and order traits plus the HTTP client
//! - [`reconciler::Reconciler`] - the checkout state machine
//! - [`state::ShopState`] - wires everything from [`config::CheckoutConfig`]

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod auth;
pub mod cart;
pub mod config;
pub mod error;
pub mod reconciler;
pub mod remote;
pub mod state;

pub use error::{CheckoutError, SyncStage};
pub use reconciler::{CheckoutSuccess, Reconciler};
