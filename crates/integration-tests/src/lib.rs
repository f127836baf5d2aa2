//! Integration test harness for the Loomway cart engine.
//!
//! [`MockMarketplace`] is an in-process axum server implementing the cart
//! REST contract: an in-memory canonical cart, a price book, bearer-auth
//! checking, and injectable failures and delays. [`TestContext`] wires a
//! real [`CartStore`] to it, so the tests under `tests/` exercise the full
//! store -> HTTP client -> server -> reconciliation path.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p loomway-integration-tests
//! ```
//!
//! No external services are required; every test spawns its own mock on an
//! ephemeral port.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use parking_lot::Mutex;
use rust_decimal::Decimal;

use loomway_cart::api::types::{
    AddItemRequest, ClearCartResponse, RemoteCart, RemoteLineItem, UpdateItemRequest,
};
use loomway_cart::{
    CART_ITEMS_KEY, CartApiClient, CartConfig, CartStore, KeyValueStore, SessionProvider,
};
use loomway_core::{
    CartId, CartLineItem, ProductId, ProductSnapshot, UserId, VariantId, VariantSnapshot,
};

/// The bearer token the mock accepts; [`TestContext::authenticated`] installs
/// it in the session provider.
pub const TEST_TOKEN: &str = "test-session-token";

// =============================================================================
// Mock marketplace server
// =============================================================================

/// In-process implementation of the cart REST contract.
pub struct MockMarketplace {
    state: Arc<MockState>,
    base_url: String,
}

struct MockState {
    lines: Mutex<Vec<RemoteLineItem>>,
    prices: Mutex<HashMap<(ProductId, Option<VariantId>), Decimal>>,
    next_id: AtomicU64,
    requests: AtomicU64,
    fail: AtomicBool,
    delay_ms: AtomicU64,
}

impl MockMarketplace {
    /// Bind an ephemeral port and serve the cart routes in a background task.
    pub async fn spawn() -> Self {
        let state = Arc::new(MockState {
            lines: Mutex::new(Vec::new()),
            prices: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            requests: AtomicU64::new(0),
            fail: AtomicBool::new(false),
            delay_ms: AtomicU64::new(0),
        });

        let app = Router::new()
            .route("/cart", get(fetch_cart).delete(clear_cart))
            .route("/cart/items", post(add_item))
            .route("/cart/items/{item_id}", put(update_item).delete(remove_item))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock marketplace");
        let addr = listener.local_addr().expect("Failed to read local address");
        tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("Mock marketplace crashed");
        });

        Self {
            state,
            base_url: format!("http://{addr}"),
        }
    }

    /// Base URL of the running mock, e.g. `http://127.0.0.1:49152`.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Register the unit price the server assigns when this product/variant
    /// is added. Unpriced products resolve to zero.
    pub fn set_price(&self, product_id: &str, variant_id: Option<&str>, unit_price: Decimal) {
        self.state.prices.lock().insert(
            (ProductId::new(product_id), variant_id.map(VariantId::new)),
            unit_price,
        );
    }

    /// Preload a confirmed line into the server cart. Returns the assigned
    /// server line ID.
    pub fn seed_line(
        &self,
        product_id: &str,
        variant_id: Option<&str>,
        quantity: u32,
        unit_price: Decimal,
    ) -> String {
        let id = self.state.fresh_id();
        self.state.lines.lock().push(server_line(
            &id,
            &ProductId::new(product_id),
            variant_id.map(VariantId::new).as_ref(),
            quantity,
            unit_price,
        ));
        id
    }

    /// When enabled, every request answers 500 before touching the cart.
    pub fn fail_requests(&self, fail: bool) {
        self.state.fail.store(fail, Ordering::SeqCst);
    }

    /// Delay every request by the given duration before handling it.
    pub fn set_delay(&self, delay: Duration) {
        let ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.state.delay_ms.store(ms, Ordering::SeqCst);
    }

    /// Total number of requests received, including failed and unauthorized
    /// ones.
    #[must_use]
    pub fn request_count(&self) -> u64 {
        self.state.requests.load(Ordering::SeqCst)
    }

    /// Snapshot of the server-side cart lines.
    #[must_use]
    pub fn lines(&self) -> Vec<RemoteLineItem> {
        self.state.lines.lock().clone()
    }
}

impl MockState {
    fn fresh_id(&self) -> String {
        format!("srv-{}", self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    fn price_for(&self, product_id: &ProductId, variant_id: Option<&VariantId>) -> Decimal {
        self.prices
            .lock()
            .get(&(product_id.clone(), variant_id.cloned()))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    /// Count, delay, and gate the request. Returns the error response for
    /// injected failures and bad credentials.
    async fn gate(&self, headers: &HeaderMap) -> Result<(), Response> {
        self.requests.fetch_add(1, Ordering::SeqCst);

        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        if self.fail.load(Ordering::SeqCst) {
            return Err((StatusCode::INTERNAL_SERVER_ERROR, "injected failure").into_response());
        }

        let authorized = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value == format!("Bearer {TEST_TOKEN}"));
        if !authorized {
            return Err(
                (StatusCode::UNAUTHORIZED, "missing or invalid bearer token").into_response(),
            );
        }

        Ok(())
    }

    fn canonical(&self) -> RemoteCart {
        let items = self.lines.lock().clone();
        let total = items
            .iter()
            .map(|line| line.unit_price * Decimal::from(line.quantity))
            .sum();
        let item_count = items.iter().map(|line| line.quantity).sum();
        RemoteCart {
            id: CartId::new("cart-test"),
            user_id: UserId::new("user-test"),
            items,
            total,
            item_count,
        }
    }
}

/// Build a server-side line with synthesized catalog snapshots.
fn server_line(
    id: &str,
    product_id: &ProductId,
    variant_id: Option<&VariantId>,
    quantity: u32,
    unit_price: Decimal,
) -> RemoteLineItem {
    RemoteLineItem {
        id: id.to_owned(),
        product_id: product_id.clone(),
        variant_id: variant_id.cloned(),
        quantity,
        unit_price,
        product: ProductSnapshot {
            id: product_id.clone(),
            name: format!("Product {product_id}"),
            image_url: None,
        },
        variant: variant_id.map(|variant_id| VariantSnapshot {
            id: variant_id.clone(),
            name: format!("Variant {variant_id}"),
        }),
    }
}

// =============================================================================
// Route handlers
// =============================================================================

async fn fetch_cart(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if let Err(response) = state.gate(&headers).await {
        return response;
    }
    Json(state.canonical()).into_response()
}

async fn add_item(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<AddItemRequest>,
) -> Response {
    if let Err(response) = state.gate(&headers).await {
        return response;
    }

    {
        let mut lines = state.lines.lock();
        if let Some(line) = lines
            .iter_mut()
            .find(|line| line.product_id == body.product_id && line.variant_id == body.variant_id)
        {
            line.quantity = line.quantity.saturating_add(body.quantity);
        } else {
            let id = state.fresh_id();
            let unit_price = state.price_for(&body.product_id, body.variant_id.as_ref());
            lines.push(server_line(
                &id,
                &body.product_id,
                body.variant_id.as_ref(),
                body.quantity,
                unit_price,
            ));
        }
    }

    Json(state.canonical()).into_response()
}

async fn update_item(
    State(state): State<Arc<MockState>>,
    Path(item_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<UpdateItemRequest>,
) -> Response {
    if let Err(response) = state.gate(&headers).await {
        return response;
    }

    let found = {
        let mut lines = state.lines.lock();
        match lines.iter_mut().find(|line| line.id == item_id) {
            Some(line) => {
                line.quantity = body.quantity;
                true
            }
            None => false,
        }
    };

    if found {
        Json(state.canonical()).into_response()
    } else {
        (StatusCode::NOT_FOUND, "no such cart item").into_response()
    }
}

async fn remove_item(
    State(state): State<Arc<MockState>>,
    Path(item_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    if let Err(response) = state.gate(&headers).await {
        return response;
    }

    let removed = {
        let mut lines = state.lines.lock();
        let before = lines.len();
        lines.retain(|line| line.id != item_id);
        lines.len() != before
    };

    if removed {
        Json(state.canonical()).into_response()
    } else {
        (StatusCode::NOT_FOUND, "no such cart item").into_response()
    }
}

async fn clear_cart(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if let Err(response) = state.gate(&headers).await {
        return response;
    }

    state.lines.lock().clear();
    Json(ClearCartResponse {
        message: "Cart cleared".to_owned(),
    })
    .into_response()
}

// =============================================================================
// Test context
// =============================================================================

/// A [`CartStore`] wired to its own [`MockMarketplace`] with in-memory
/// persistence.
pub struct TestContext {
    pub marketplace: MockMarketplace,
    pub store: CartStore,
    pub storage: KeyValueStore,
    pub session: SessionProvider,
}

impl TestContext {
    /// Context with a session token installed; mutations mirror to the mock.
    pub async fn authenticated() -> Self {
        Self::build(SessionProvider::with_token(TEST_TOKEN)).await
    }

    /// Context without a session token; the store runs in guest mode.
    pub async fn guest() -> Self {
        Self::build(SessionProvider::new()).await
    }

    async fn build(session: SessionProvider) -> Self {
        let marketplace = MockMarketplace::spawn().await;
        let config = CartConfig::for_base_url(marketplace.base_url())
            .expect("mock base URL should parse");
        let api = CartApiClient::new(&config);
        let storage = KeyValueStore::in_memory();
        let store = CartStore::new(api, session.clone(), storage.clone());
        Self {
            marketplace,
            store,
            storage,
            session,
        }
    }

    /// Product snapshot the way the mobile catalog screen would supply it.
    #[must_use]
    pub fn snapshot(product_id: &str) -> ProductSnapshot {
        ProductSnapshot {
            id: ProductId::new(product_id),
            name: format!("Product {product_id}"),
            image_url: None,
        }
    }

    /// Variant snapshot the way the mobile catalog screen would supply it.
    #[must_use]
    pub fn variant(variant_id: &str) -> VariantSnapshot {
        VariantSnapshot {
            id: VariantId::new(variant_id),
            name: format!("Variant {variant_id}"),
        }
    }

    /// Read the persisted cart cache back as line items.
    pub async fn cached_items(&self) -> Vec<CartLineItem> {
        let json = self
            .storage
            .get(CART_ITEMS_KEY)
            .await
            .expect("cache read failed")
            .expect("no cart cache written");
        serde_json::from_str(&json).expect("cart cache is not valid JSON")
    }
}
