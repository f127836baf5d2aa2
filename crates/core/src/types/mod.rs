//! Core types for the Loomway cart engine.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod line_item;

pub use id::*;
pub use line_item::{CartLineItem, ProductSnapshot, VariantSnapshot};
