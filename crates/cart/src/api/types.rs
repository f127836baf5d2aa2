//! Wire types for the cart REST API.
//!
//! Field names are camelCase on the wire. Decimal amounts travel as strings
//! (preserves precision); [`rust_decimal::serde::str`] pins that on both
//! sides of the conversion.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use loomway_core::{
    CartId, CartLineItem, LineItemId, ProductId, ProductSnapshot, UserId, VariantId,
    VariantSnapshot,
};

/// Canonical server cart, returned by every cart endpoint except clear.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteCart {
    /// Server-side cart ID.
    pub id: CartId,
    /// Owner of the cart.
    pub user_id: UserId,
    /// Canonical line items, in server order.
    pub items: Vec<RemoteLineItem>,
    /// Sum of line totals, as computed by the server.
    #[serde(with = "rust_decimal::serde::str")]
    pub total: Decimal,
    /// Sum of quantities, as computed by the server.
    pub item_count: u32,
}

impl RemoteCart {
    /// Convert the canonical cart into local line items. Server line IDs
    /// become confirmed identities.
    #[must_use]
    pub fn into_line_items(self) -> Vec<CartLineItem> {
        self.items
            .into_iter()
            .map(RemoteLineItem::into_line_item)
            .collect()
    }
}

/// A line item as the server represents it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteLineItem {
    /// Server-assigned line ID.
    pub id: String,
    /// Catalog product ID.
    pub product_id: ProductId,
    /// Selected variant, when the product has variants.
    pub variant_id: Option<VariantId>,
    /// Number of units.
    pub quantity: u32,
    /// Per-unit price; the server's value is authoritative.
    #[serde(with = "rust_decimal::serde::str")]
    pub unit_price: Decimal,
    /// Denormalized product snapshot.
    pub product: ProductSnapshot,
    /// Denormalized variant snapshot, when a variant is selected.
    pub variant: Option<VariantSnapshot>,
}

impl RemoteLineItem {
    /// Convert the server line into the local model.
    #[must_use]
    pub fn into_line_item(self) -> CartLineItem {
        CartLineItem {
            id: LineItemId::Remote(self.id),
            product_id: self.product_id,
            variant_id: self.variant_id,
            quantity: self.quantity,
            unit_price: self.unit_price,
            product: self.product,
            variant: self.variant,
        }
    }
}

/// Body for `POST /cart/items`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    /// Catalog product to add.
    pub product_id: ProductId,
    /// Selected variant, omitted for variantless products.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<VariantId>,
    /// Number of units to add.
    pub quantity: u32,
}

/// Body for `PUT /cart/items/{itemId}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateItemRequest {
    /// New absolute quantity for the line.
    pub quantity: u32,
}

/// Response for `DELETE /cart`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearCartResponse {
    /// Human-readable confirmation.
    pub message: String,
}
