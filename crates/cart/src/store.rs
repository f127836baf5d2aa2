//! The cart reconciliation store.
//!
//! One observable list of line items, kept consistent across three worlds:
//!
//! - **In memory** - every mutation applies to the list immediately, so the
//!   UI never waits on the network.
//! - **Local storage** - after each change the full list is persisted under a
//!   single key, gated on the initial load having completed so an empty
//!   pre-load state never clobbers a previously saved cart.
//! - **Server** - with a session token, mutations are mirrored to the cart
//!   API; a successful call replaces the whole list with the server's
//!   canonical cart (server wins), a failed call leaves the optimistic local
//!   state in place. Without a token the cart runs fully local.
//!
//! Remote failures are never errors here. Every operation reports a
//! [`SyncOutcome`] instead, and the caller decides whether "couldn't reach
//! the shop" deserves a notice.
//!
//! The item list sits behind a lock that is only held for synchronous
//! sections; remote calls are awaited outside it. When two operations are in
//! flight, the later confirmation wins even if it reflects an older server
//! state - installing a canonical cart replaces the whole list.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use rust_decimal::Decimal;
use tracing::{debug, instrument, warn};

use loomway_core::{CartLineItem, LineItemId, ProductSnapshot, VariantSnapshot};

use crate::api::CartApiClient;
use crate::api::types::{AddItemRequest, RemoteCart};
use crate::session::SessionProvider;
use crate::storage::KeyValueStore;

/// Storage key holding the JSON-serialized line-item array. Public so hosts
/// can migrate or wipe the cache without reaching into the store.
pub const CART_ITEMS_KEY: &str = "cart.items";

/// How a cart operation settled against the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// A remote call succeeded and the canonical server cart was installed.
    Synced,
    /// No remote call was attempted: guest mode, a local-only line, or a
    /// no-op mutation.
    LocalOnly,
    /// A remote call failed; the optimistic local state was kept.
    Degraded,
}

/// What the remote mirror of an add has to do, decided under the lock.
enum RemoteMirror {
    /// A new line was appended locally; create it on the server.
    Create(AddItemRequest),
    /// An existing confirmed line absorbed the quantity; update it.
    Update { item_id: String, quantity: u32 },
    /// The absorbing line is still a local placeholder; nothing exists on
    /// the server to update.
    None,
}

/// The observable cart.
///
/// Cheap to clone; all clones share the same state.
#[derive(Clone)]
pub struct CartStore {
    inner: Arc<CartStoreInner>,
}

struct CartStoreInner {
    api: CartApiClient,
    session: SessionProvider,
    storage: KeyValueStore,
    items: RwLock<Vec<CartLineItem>>,
    initialized: AtomicBool,
}

impl CartStore {
    /// Wire a store to its collaborators. The store starts empty and
    /// unpersisted until [`load`](Self::load) runs.
    #[must_use]
    pub fn new(api: CartApiClient, session: SessionProvider, storage: KeyValueStore) -> Self {
        Self {
            inner: Arc::new(CartStoreInner {
                api,
                session,
                storage,
                items: RwLock::new(Vec::new()),
                initialized: AtomicBool::new(false),
            }),
        }
    }

    // =========================================================================
    // Startup
    // =========================================================================

    /// Load the cart: adopt the persisted cache if one exists, then
    /// reconcile with the server when a session is present (server wins).
    ///
    /// Never fails. A missing or corrupt cache leaves the list as it is, and
    /// a failed server fetch keeps whatever the cache held.
    #[instrument(skip(self))]
    pub async fn load(&self) {
        if let Some(cached) = self.read_cache().await {
            *self.inner.items.write() = cached;
        }
        self.inner.initialized.store(true, Ordering::Release);

        if let Some(token) = self.inner.session.token() {
            match self.inner.api.fetch_cart(&token).await {
                Ok(cart) => self.install_canonical(cart).await,
                Err(error) => {
                    warn!(%error, "cart fetch failed on load, keeping cached items");
                }
            }
        }
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add a product/variant to the cart.
    ///
    /// An existing line with the same `(product, variant)` key absorbs the
    /// quantity; otherwise a local placeholder line is appended with a zero
    /// unit price. With a session the change is mirrored remotely, and on
    /// success the server's canonical cart replaces the optimistic guess.
    /// Zero quantities are ignored.
    #[instrument(skip(self, product, variant), fields(product_id = %product.id))]
    pub async fn add_item(
        &self,
        product: ProductSnapshot,
        variant: Option<VariantSnapshot>,
        quantity: u32,
    ) -> SyncOutcome {
        if quantity == 0 {
            debug!("ignoring add with zero quantity");
            return SyncOutcome::LocalOnly;
        }

        let mirror = {
            let mut items = self.inner.items.write();
            let product_id = product.id.clone();
            let variant_id = variant.as_ref().map(|v| v.id.clone());

            if let Some(line) = items
                .iter_mut()
                .find(|line| line.matches_key(&product_id, variant_id.as_ref()))
            {
                line.quantity = line.quantity.saturating_add(quantity);
                match line.id.as_remote() {
                    Some(item_id) => RemoteMirror::Update {
                        item_id: item_id.to_owned(),
                        quantity: line.quantity,
                    },
                    None => RemoteMirror::None,
                }
            } else {
                let line = CartLineItem::optimistic(product, variant, quantity);
                let request = AddItemRequest {
                    product_id: line.product_id.clone(),
                    variant_id: line.variant_id.clone(),
                    quantity,
                };
                items.push(line);
                RemoteMirror::Create(request)
            }
        };

        self.persist().await;

        let Some(token) = self.inner.session.token() else {
            return SyncOutcome::LocalOnly;
        };

        let result = match &mirror {
            RemoteMirror::Create(request) => self.inner.api.add_item(&token, request).await,
            RemoteMirror::Update { item_id, quantity } => {
                self.inner.api.update_item(&token, item_id, *quantity).await
            }
            RemoteMirror::None => return SyncOutcome::LocalOnly,
        };

        match result {
            Ok(cart) => {
                self.install_canonical(cart).await;
                SyncOutcome::Synced
            }
            Err(error) => {
                warn!(%error, "remote add failed, keeping optimistic cart");
                SyncOutcome::Degraded
            }
        }
    }

    /// Set a line's quantity. Zero or below removes the line instead.
    ///
    /// Unknown IDs are a no-op. On remote failure the value passed to the
    /// failed call is re-applied, so the operation does not revert once
    /// issued locally.
    #[instrument(skip(self, item_id), fields(item_id = %item_id))]
    pub async fn update_quantity(&self, item_id: &LineItemId, quantity: i64) -> SyncOutcome {
        if quantity <= 0 {
            return self.remove_item(item_id).await;
        }
        let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);

        let found = {
            let mut items = self.inner.items.write();
            if let Some(line) = items.iter_mut().find(|line| line.id == *item_id) {
                line.quantity = quantity;
                true
            } else {
                false
            }
        };

        if !found {
            debug!("quantity update for unknown cart line ignored");
            return SyncOutcome::LocalOnly;
        }

        self.persist().await;

        let Some(token) = self.inner.session.token() else {
            return SyncOutcome::LocalOnly;
        };
        let Some(remote_id) = item_id.as_remote() else {
            return SyncOutcome::LocalOnly;
        };

        match self.inner.api.update_item(&token, remote_id, quantity).await {
            Ok(cart) => {
                self.install_canonical(cart).await;
                SyncOutcome::Synced
            }
            Err(error) => {
                warn!(%error, "remote quantity update failed, keeping local value");
                // Keep exactly the value sent with the failed call, even if a
                // racing operation changed it in the meantime.
                {
                    let mut items = self.inner.items.write();
                    if let Some(line) = items.iter_mut().find(|line| line.id == *item_id) {
                        line.quantity = quantity;
                    }
                }
                self.persist().await;
                SyncOutcome::Degraded
            }
        }
    }

    /// Remove a line. Unknown IDs are a no-op.
    ///
    /// The local deletion sticks even when the remote delete fails.
    #[instrument(skip(self, item_id), fields(item_id = %item_id))]
    pub async fn remove_item(&self, item_id: &LineItemId) -> SyncOutcome {
        let removed = {
            let mut items = self.inner.items.write();
            let before = items.len();
            items.retain(|line| line.id != *item_id);
            items.len() != before
        };

        if !removed {
            debug!("remove for unknown cart line ignored");
            return SyncOutcome::LocalOnly;
        }

        self.persist().await;

        let Some(token) = self.inner.session.token() else {
            return SyncOutcome::LocalOnly;
        };
        let Some(remote_id) = item_id.as_remote() else {
            return SyncOutcome::LocalOnly;
        };

        match self.inner.api.remove_item(&token, remote_id).await {
            Ok(cart) => {
                self.install_canonical(cart).await;
                SyncOutcome::Synced
            }
            Err(error) => {
                warn!(%error, "remote remove failed, keeping local deletion");
                SyncOutcome::Degraded
            }
        }
    }

    /// Empty the cart immediately and persist the empty list.
    ///
    /// The server-side clear is fire-and-forget as far as the in-memory
    /// state is concerned; its response carries no cart to install.
    #[instrument(skip(self))]
    pub async fn clear_cart(&self) -> SyncOutcome {
        self.inner.items.write().clear();
        self.persist().await;

        let Some(token) = self.inner.session.token() else {
            return SyncOutcome::LocalOnly;
        };

        match self.inner.api.clear_cart(&token).await {
            Ok(_) => SyncOutcome::Synced,
            Err(error) => {
                warn!(%error, "remote clear failed, keeping empty local cart");
                SyncOutcome::Degraded
            }
        }
    }

    /// Explicitly re-fetch the canonical server cart and install it.
    ///
    /// No-op in guest mode. Fetch failures leave the current items alone.
    #[instrument(skip(self))]
    pub async fn sync_cart(&self) -> SyncOutcome {
        let Some(token) = self.inner.session.token() else {
            return SyncOutcome::LocalOnly;
        };

        match self.inner.api.fetch_cart(&token).await {
            Ok(cart) => {
                self.install_canonical(cart).await;
                SyncOutcome::Synced
            }
            Err(error) => {
                warn!(%error, "cart sync failed, keeping current items");
                SyncOutcome::Degraded
            }
        }
    }

    // =========================================================================
    // Projections
    // =========================================================================

    /// Snapshot of the current line items.
    #[must_use]
    pub fn items(&self) -> Vec<CartLineItem> {
        self.inner.items.read().clone()
    }

    /// Sum of all line quantities.
    #[must_use]
    pub fn total_items(&self) -> u64 {
        self.inner
            .items
            .read()
            .iter()
            .map(|line| u64::from(line.quantity))
            .sum()
    }

    /// Sum of `unit_price x quantity` over all lines. Unconfirmed lines
    /// contribute zero until the server prices them.
    #[must_use]
    pub fn total_price(&self) -> Decimal {
        self.inner
            .items
            .read()
            .iter()
            .map(CartLineItem::line_total)
            .sum()
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.items.read().is_empty()
    }

    /// Whether the initial storage read has completed.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.inner.initialized.load(Ordering::Acquire)
    }

    // =========================================================================
    // Reconciliation internals
    // =========================================================================

    /// Replace the whole list with the server's canonical cart and persist.
    async fn install_canonical(&self, cart: RemoteCart) {
        *self.inner.items.write() = cart.into_line_items();
        self.persist().await;
    }

    /// Adopt the persisted line items, if a parseable cache exists.
    async fn read_cache(&self) -> Option<Vec<CartLineItem>> {
        match self.inner.storage.get(CART_ITEMS_KEY).await {
            Ok(Some(json)) => match serde_json::from_str(&json) {
                Ok(items) => Some(items),
                Err(error) => {
                    warn!(%error, "persisted cart is corrupt, starting empty");
                    None
                }
            },
            Ok(None) => None,
            Err(error) => {
                warn!(%error, "could not read persisted cart, starting empty");
                None
            }
        }
    }

    /// Write the current items to storage. Skipped until [`load`](Self::load)
    /// has run; failures are logged and swallowed (the cache is only a
    /// cache).
    async fn persist(&self) {
        if !self.inner.initialized.load(Ordering::Acquire) {
            debug!("skipping cart persist before initial load");
            return;
        }

        let snapshot = self.inner.items.read().clone();
        match serde_json::to_string(&snapshot) {
            Ok(json) => {
                if let Err(error) = self.inner.storage.set(CART_ITEMS_KEY, &json).await {
                    warn!(%error, "failed to persist cart");
                }
            }
            Err(error) => warn!(%error, "failed to serialize cart for persistence"),
        }
    }
}
