//! Bookcart Core - Shared cart and checkout types.
//!
//! This crate provides the domain types used across all Bookcart components:
//! - `checkout` - Cart store, remote shop client and checkout reconciler
//! - `cli` - Command-line driver for running a checkout against a backend
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no HTTP
//! clients, no runtime. Cart arithmetic and checkout form validation live
//! here so they can be tested without a network.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, prices, the cart model, checkout form and order types

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
