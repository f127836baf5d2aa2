//! Cart line items and the denormalized catalog snapshots they render from.
//!
//! Line identity is the `(product, variant)` pair: adding the same pair twice
//! merges quantities instead of creating a second line, and a variantless line
//! never collides with a variant of the same product.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::id::{LineItemId, ProductId, VariantId};

/// Denormalized product data carried on a line item.
///
/// The snapshot exists so the cart can render a line without a catalog
/// lookup. It is supplied by the caller when a line is added optimistically
/// and replaced wholesale by the server's copy on reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSnapshot {
    /// Catalog product ID.
    pub id: ProductId,
    /// Product display name.
    pub name: String,
    /// Primary image URL, if the catalog has one.
    pub image_url: Option<String>,
}

/// Denormalized variant data (size, color, ...) carried on a line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantSnapshot {
    /// Catalog variant ID.
    pub id: VariantId,
    /// Variant display name, e.g. "Small / Indigo".
    pub name: String,
}

/// A single line in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineItem {
    /// Line identity: local placeholder or server-confirmed.
    pub id: LineItemId,
    /// Catalog product this line refers to.
    pub product_id: ProductId,
    /// Selected variant, when the product has variants.
    pub variant_id: Option<VariantId>,
    /// Number of units. Always at least 1; driving a quantity to zero removes
    /// the line instead.
    pub quantity: u32,
    /// Per-unit price. Zero for unconfirmed local lines; the server's value
    /// is authoritative after reconciliation.
    pub unit_price: Decimal,
    /// Product snapshot for rendering.
    pub product: ProductSnapshot,
    /// Variant snapshot, when a variant is selected.
    pub variant: Option<VariantSnapshot>,
}

impl CartLineItem {
    /// Build a fresh optimistic line with a local placeholder ID and a zero
    /// unit price. The server supplies both on confirmation.
    #[must_use]
    pub fn optimistic(
        product: ProductSnapshot,
        variant: Option<VariantSnapshot>,
        quantity: u32,
    ) -> Self {
        Self {
            id: LineItemId::new_local(),
            product_id: product.id.clone(),
            variant_id: variant.as_ref().map(|v| v.id.clone()),
            quantity,
            unit_price: Decimal::ZERO,
            product,
            variant,
        }
    }

    /// Total for this line: unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }

    /// Whether this line holds the given product/variant combination.
    #[must_use]
    pub fn matches_key(&self, product_id: &ProductId, variant_id: Option<&VariantId>) -> bool {
        self.product_id == *product_id && self.variant_id.as_ref() == variant_id
    }
}
