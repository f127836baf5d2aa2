//! Integration tests for cart load and reconciliation.
//!
//! Covers the startup merge (server wins over the local cache once a session
//! is present), explicit sync, and cache persistence across restarts.
//!
//! Run with: cargo test -p loomway-integration-tests

use rust_decimal::Decimal;

use loomway_cart::store::SyncOutcome;
use loomway_cart::{CART_ITEMS_KEY, CartApiClient, CartConfig, CartStore, KeyValueStore};
use loomway_core::LineItemId;
use loomway_integration_tests::TestContext;

// ============================================================================
// Startup merge
// ============================================================================

#[tokio::test]
async fn test_load_replaces_cache_with_server_cart() {
    let ctx = TestContext::authenticated().await;

    // Stale local cache: one line the server no longer has.
    let stale = vec![loomway_core::CartLineItem {
        id: LineItemId::remote("srv-old"),
        product_id: "prod-old".into(),
        variant_id: None,
        quantity: 4,
        unit_price: Decimal::new(100, 2),
        product: TestContext::snapshot("prod-old"),
        variant: None,
    }];
    let json = serde_json::to_string(&stale).expect("serialize stale cache");
    ctx.storage
        .set(CART_ITEMS_KEY, &json)
        .await
        .expect("seed cache");

    let server_id = ctx
        .marketplace
        .seed_line("prod-1", None, 2, Decimal::new(1999, 2));

    ctx.store.load().await;

    // Server wins, and the cache now holds the server cart too.
    let items = ctx.store.items();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, LineItemId::remote(&server_id));
    assert_eq!(items[0].quantity, 2);
    assert_eq!(items[0].unit_price, Decimal::new(1999, 2));
    assert_eq!(ctx.cached_items().await, items);
}

#[tokio::test]
async fn test_guest_load_keeps_cache_and_skips_network() {
    let ctx = TestContext::guest().await;
    ctx.marketplace.seed_line("prod-1", None, 2, Decimal::ONE);

    ctx.store.load().await;

    assert!(ctx.store.is_empty());
    assert_eq!(ctx.marketplace.request_count(), 0);
}

#[tokio::test]
async fn test_load_with_failing_server_keeps_cache() {
    let ctx = TestContext::authenticated().await;

    let cached = vec![loomway_core::CartLineItem {
        id: LineItemId::remote("srv-1"),
        product_id: "prod-1".into(),
        variant_id: None,
        quantity: 3,
        unit_price: Decimal::new(500, 2),
        product: TestContext::snapshot("prod-1"),
        variant: None,
    }];
    let json = serde_json::to_string(&cached).expect("serialize cache");
    ctx.storage
        .set(CART_ITEMS_KEY, &json)
        .await
        .expect("seed cache");

    ctx.marketplace.fail_requests(true);
    ctx.store.load().await;

    assert_eq!(ctx.store.items(), cached);
    assert_eq!(ctx.store.total_items(), 3);
}

// ============================================================================
// Explicit sync
// ============================================================================

#[tokio::test]
async fn test_sync_installs_server_cart() {
    let ctx = TestContext::authenticated().await;
    ctx.store.load().await;
    assert!(ctx.store.is_empty());

    // Another device adds a line; this device syncs explicitly.
    let server_id = ctx
        .marketplace
        .seed_line("prod-7", Some("var-7-m"), 1, Decimal::new(3500, 2));

    let outcome = ctx.store.sync_cart().await;

    assert_eq!(outcome, SyncOutcome::Synced);
    let items = ctx.store.items();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, LineItemId::remote(&server_id));
    assert_eq!(ctx.store.total_price(), Decimal::new(3500, 2));
    assert_eq!(ctx.cached_items().await, items);
}

#[tokio::test]
async fn test_sync_failure_leaves_items_unchanged() {
    let ctx = TestContext::authenticated().await;
    ctx.marketplace
        .seed_line("prod-1", None, 2, Decimal::new(1000, 2));
    ctx.store.load().await;
    let before = ctx.store.items();

    ctx.marketplace.fail_requests(true);
    let outcome = ctx.store.sync_cart().await;

    assert_eq!(outcome, SyncOutcome::Degraded);
    assert_eq!(ctx.store.items(), before);
}

#[tokio::test]
async fn test_guest_sync_is_noop() {
    let ctx = TestContext::guest().await;
    ctx.store.load().await;

    let outcome = ctx.store.sync_cart().await;

    assert_eq!(outcome, SyncOutcome::LocalOnly);
    assert_eq!(ctx.marketplace.request_count(), 0);
}

// ============================================================================
// Cache persistence across restarts
// ============================================================================

#[tokio::test]
async fn test_cart_survives_restart_with_file_storage() {
    let dir = tempfile::tempdir().expect("tempdir");
    let marketplace = loomway_integration_tests::MockMarketplace::spawn().await;
    let config = CartConfig::for_base_url(marketplace.base_url()).expect("config");

    // First app run: guest adds a line, which lands in the file cache.
    {
        let store = CartStore::new(
            CartApiClient::new(&config),
            loomway_cart::SessionProvider::new(),
            KeyValueStore::file(dir.path()),
        );
        store.load().await;
        store
            .add_item(TestContext::snapshot("prod-1"), None, 2)
            .await;
        assert_eq!(store.total_items(), 2);
    }

    // Second app run: a fresh store over the same directory sees the cart.
    let store = CartStore::new(
        CartApiClient::new(&config),
        loomway_cart::SessionProvider::new(),
        KeyValueStore::file(dir.path()),
    );
    store.load().await;

    assert_eq!(store.total_items(), 2);
    let items = store.items();
    assert_eq!(items.len(), 1);
    assert!(items[0].id.is_local());
}
