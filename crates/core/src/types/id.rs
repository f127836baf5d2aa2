//! Newtype IDs for type-safe catalog and cart references.
//!
//! Use the `define_str_id!` macro to create type-safe ID wrappers that prevent
//! accidentally mixing IDs from different entity types. Cart line identity is
//! the [`LineItemId`] enum, which keeps client-generated placeholders and
//! server-assigned IDs apart at the type level.

use core::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around an owned `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`
/// - Conversion methods: `new()`, `as_str()`
/// - `From<String>`, `From<&str>`, and `Into<String>` implementations
///
/// Catalog IDs are opaque strings assigned by the backend, so unlike numeric
/// database keys they are never parsed or compared numerically.
///
/// # Example
///
/// ```rust
/// # use loomway_core::define_str_id;
/// define_str_id!(ProductId);
/// define_str_id!(VariantId);
///
/// let product_id = ProductId::new("prod-81");
/// let variant_id = VariantId::new("var-81-s");
///
/// // These are different types, so this won't compile:
/// // let _: ProductId = variant_id;
/// ```
#[macro_export]
macro_rules! define_str_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from a string value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the underlying string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

// Define standard entity IDs
define_str_id!(ProductId);
define_str_id!(VariantId);
define_str_id!(CartId);
define_str_id!(UserId);

/// Identity of a cart line item.
///
/// A line added optimistically on this device carries a client-generated
/// `Local` placeholder until the server confirms it; after reconciliation the
/// line carries the server-assigned `Remote` ID. Keeping the two as separate
/// variants means no code ever has to sniff an ID string to decide whether a
/// line exists on the server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineItemId {
    /// Client-generated placeholder for a line the server has not confirmed.
    Local(Uuid),
    /// Server-assigned line ID from the canonical cart.
    Remote(String),
}

impl LineItemId {
    /// Generate a fresh local placeholder ID.
    #[must_use]
    pub fn new_local() -> Self {
        Self::Local(Uuid::new_v4())
    }

    /// Wrap a server-assigned line ID.
    #[must_use]
    pub fn remote(id: impl Into<String>) -> Self {
        Self::Remote(id.into())
    }

    /// Whether this line is still a local-only placeholder.
    #[must_use]
    pub const fn is_local(&self) -> bool {
        matches!(self, Self::Local(_))
    }

    /// Whether the server has confirmed this line.
    #[must_use]
    pub const fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }

    /// The server-assigned ID, if this line has one.
    #[must_use]
    pub fn as_remote(&self) -> Option<&str> {
        match self {
            Self::Remote(id) => Some(id),
            Self::Local(_) => None,
        }
    }
}

impl fmt::Display for LineItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(id) => write!(f, "local-{id}"),
            Self::Remote(id) => write!(f, "{id}"),
        }
    }
}
