//! Loomway cart engine.
//!
//! This crate is the client-side cart for the Loomway mobile storefront: an
//! observable line-item list that is mirrored optimistically to the remote
//! cart API and cached in local key-value storage, so the cart survives app
//! restarts and stays usable when the network or the backend is down.
//!
//! # Modules
//!
//! - [`store`] - The reconciliation store: optimistic mutations, server-wins
//!   merging, persistence gating
//! - [`api`] - REST client for the `/cart` endpoints
//! - [`session`] - Shared session-token handle written by the host app's auth
//!   layer
//! - [`storage`] - Key-value persistence (in-memory or file-backed)
//! - [`config`] - Environment-driven configuration for app wiring

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod config;
pub mod session;
pub mod storage;
pub mod store;

pub use api::CartApiClient;
pub use config::{CartConfig, ConfigError};
pub use session::SessionProvider;
pub use storage::KeyValueStore;
pub use store::{CART_ITEMS_KEY, CartStore, SyncOutcome};
