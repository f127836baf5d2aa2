//! Loomway Core - Shared types library.
//!
//! This crate provides common types used across the Loomway cart engine:
//! - `cart` - The reconciliation store, cart API client, and local persistence
//! - `integration-tests` - End-to-end tests against a mock cart API
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients, no async.
//! This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for catalog IDs, line identity, and cart
//!   line items

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
