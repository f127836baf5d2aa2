//! Integration tests for guest mode and degraded (backend-down) operation.
//!
//! The engine never surfaces a remote failure as an error: mutations keep
//! their optimistic local result and report `Degraded`, and an explicit sync
//! reconverges once the backend is reachable again. The last test pins the
//! documented last-confirmation-wins race.
//!
//! Run with: cargo test -p loomway-integration-tests

use std::time::Duration;

use rust_decimal::Decimal;

use loomway_cart::store::SyncOutcome;
use loomway_core::LineItemId;
use loomway_integration_tests::TestContext;

// ============================================================================
// Guest mode
// ============================================================================

#[tokio::test]
async fn test_guest_mutations_never_touch_the_network() {
    let ctx = TestContext::guest().await;
    ctx.store.load().await;

    let add = ctx
        .store
        .add_item(TestContext::snapshot("prod-1"), None, 2)
        .await;
    let id = ctx.store.items()[0].id.clone();
    let update = ctx.store.update_quantity(&id, 5).await;
    let remove = ctx.store.remove_item(&id).await;
    let clear = ctx.store.clear_cart().await;
    let sync = ctx.store.sync_cart().await;

    for outcome in [add, update, remove, clear, sync] {
        assert_eq!(outcome, SyncOutcome::LocalOnly);
    }
    assert_eq!(ctx.marketplace.request_count(), 0);
}

#[tokio::test]
async fn test_guest_totals_match_session_math() {
    let ctx = TestContext::guest().await;
    ctx.store.load().await;

    ctx.store
        .add_item(TestContext::snapshot("prod-1"), None, 2)
        .await;
    ctx.store
        .add_item(
            TestContext::snapshot("prod-2"),
            Some(TestContext::variant("var-2-l")),
            1,
        )
        .await;

    assert_eq!(ctx.store.total_items(), 3);
    // Placeholder lines are unpriced until a server confirms them.
    assert_eq!(ctx.store.total_price(), Decimal::ZERO);
    assert_eq!(ctx.cached_items().await, ctx.store.items());
}

#[tokio::test]
async fn test_login_after_guest_adds_syncs_to_server_cart() {
    let ctx = TestContext::guest().await;
    ctx.store.load().await;
    ctx.store
        .add_item(TestContext::snapshot("prod-1"), None, 2)
        .await;

    // Login: the auth layer installs the token, the server already holds a
    // cart from another device, and an explicit sync adopts it wholesale.
    ctx.session.set_token(loomway_integration_tests::TEST_TOKEN);
    let server_id = ctx
        .marketplace
        .seed_line("prod-9", None, 1, Decimal::new(2500, 2));

    let outcome = ctx.store.sync_cart().await;

    assert_eq!(outcome, SyncOutcome::Synced);
    let items = ctx.store.items();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, LineItemId::remote(&server_id));
}

// ============================================================================
// Backend failures
// ============================================================================

#[tokio::test]
async fn test_failed_add_keeps_placeholder_line() {
    let ctx = TestContext::authenticated().await;
    ctx.store.load().await;
    ctx.marketplace.fail_requests(true);

    let outcome = ctx
        .store
        .add_item(
            TestContext::snapshot("prod-1"),
            Some(TestContext::variant("var-1-s")),
            2,
        )
        .await;

    assert_eq!(outcome, SyncOutcome::Degraded);
    let items = ctx.store.items();
    assert_eq!(items.len(), 1);
    assert!(items[0].id.is_local());
    assert_eq!(items[0].quantity, 2);
    assert_eq!(ctx.store.total_items(), 2);
    assert_eq!(ctx.cached_items().await, items);
    assert!(ctx.marketplace.lines().is_empty());
}

#[tokio::test]
async fn test_failed_update_keeps_attempted_value() {
    let ctx = TestContext::authenticated().await;
    let server_id = ctx
        .marketplace
        .seed_line("prod-1", None, 2, Decimal::new(1000, 2));
    ctx.store.load().await;
    ctx.marketplace.fail_requests(true);

    let id = LineItemId::remote(&server_id);
    let outcome = ctx.store.update_quantity(&id, 5).await;

    assert_eq!(outcome, SyncOutcome::Degraded);
    assert_eq!(ctx.store.items()[0].quantity, 5);
    // Client and server now diverge until the next sync.
    assert_eq!(ctx.marketplace.lines()[0].quantity, 2);

    ctx.marketplace.fail_requests(false);
    assert_eq!(ctx.store.sync_cart().await, SyncOutcome::Synced);
    assert_eq!(ctx.store.items()[0].quantity, 2);
}

#[tokio::test]
async fn test_failed_remove_keeps_local_deletion() {
    let ctx = TestContext::authenticated().await;
    let server_id = ctx
        .marketplace
        .seed_line("prod-1", None, 2, Decimal::new(1000, 2));
    ctx.store.load().await;
    ctx.marketplace.fail_requests(true);

    let outcome = ctx
        .store
        .remove_item(&LineItemId::remote(&server_id))
        .await;

    assert_eq!(outcome, SyncOutcome::Degraded);
    assert!(ctx.store.is_empty());
    // The server still has the line; sync brings it back.
    ctx.marketplace.fail_requests(false);
    assert_eq!(ctx.store.sync_cart().await, SyncOutcome::Synced);
    assert_eq!(ctx.store.items().len(), 1);
}

#[tokio::test]
async fn test_failed_clear_keeps_empty_local_cart() {
    let ctx = TestContext::authenticated().await;
    ctx.marketplace
        .seed_line("prod-1", None, 2, Decimal::new(1000, 2));
    ctx.store.load().await;
    ctx.marketplace.fail_requests(true);

    let outcome = ctx.store.clear_cart().await;

    assert_eq!(outcome, SyncOutcome::Degraded);
    assert!(ctx.store.is_empty());
    assert!(ctx.cached_items().await.is_empty());
}

// ============================================================================
// Out-of-order confirmation race
// ============================================================================

/// A slow add confirmation overwrites a newer local remove: installing a
/// canonical cart replaces the whole list, so the later response wins even
/// when it reflects older intent. Documented behavior, not a bug.
#[tokio::test]
async fn test_late_add_confirmation_reinstalls_removed_line() {
    let ctx = TestContext::authenticated().await;
    ctx.store.load().await;
    ctx.marketplace.set_delay(Duration::from_millis(200));

    let store = ctx.store.clone();
    let in_flight =
        tokio::spawn(async move { store.add_item(TestContext::snapshot("prod-1"), None, 2).await });

    // Let the optimistic insert land, then remove the line while the add
    // confirmation is still on the wire.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let local_id = ctx.store.items()[0].id.clone();
    assert!(local_id.is_local());
    ctx.store.remove_item(&local_id).await;
    assert!(ctx.store.is_empty());

    let outcome = in_flight.await.expect("add task panicked");

    assert_eq!(outcome, SyncOutcome::Synced);
    let items = ctx.store.items();
    assert_eq!(items.len(), 1);
    assert!(items[0].id.is_remote());
    assert_eq!(items[0].quantity, 2);
}
