// tests/cart_sync_tests.rs
mod common;

use common::*;
use std::time::Duration;
use storefront::models::{CartLine, UserRole};
use storefront::store::SavedCartStore;
use uuid::Uuid;

const DEBOUNCE: Duration = Duration::from_millis(800);

#[tokio::test(start_paused = true)]
async fn rapid_edits_are_written_once_after_the_quiet_period() {
  let app = test_app();
  let whey = app.product("whey-vanilla", 3499, 10).await;
  let zinc = app.product("zinc", 599, 10).await;
  let user = app.user("dana@example.com", UserRole::Customer).await;

  let session = app.state.carts.get_or_create(Uuid::new_v4());
  session.sign_in(user.id).await;
  session.add_item(whey.id, 1).await.unwrap();
  session.add_item(zinc.id, 2).await.unwrap();
  session.add_item(whey.id, 1).await.unwrap();
  assert!(session.has_pending_sync());
  assert_eq!(app.backend.saved_cart_writes(), 0);

  tokio::time::sleep(DEBOUNCE - Duration::from_millis(1)).await;
  assert_eq!(app.backend.saved_cart_writes(), 0);

  tokio::time::sleep(Duration::from_millis(2)).await;
  assert_eq!(app.backend.saved_cart_writes(), 1);

  let saved = app.backend.load_saved_cart(user.id).await.unwrap().unwrap();
  assert_eq!(
    saved.items,
    vec![
      CartLine { product_id: whey.id, quantity: 2 },
      CartLine { product_id: zinc.id, quantity: 2 },
    ]
  );
}

#[tokio::test(start_paused = true)]
async fn each_edit_restarts_the_timer() {
  let app = test_app();
  let whey = app.product("whey-vanilla", 3499, 10).await;
  let user = app.user("dana@example.com", UserRole::Customer).await;

  let session = app.state.carts.get_or_create(Uuid::new_v4());
  session.sign_in(user.id).await;
  for _ in 0..3 {
    session.add_item(whey.id, 1).await.unwrap();
    tokio::time::sleep(DEBOUNCE / 2).await;
  }
  assert_eq!(app.backend.saved_cart_writes(), 0);

  tokio::time::sleep(DEBOUNCE).await;
  assert_eq!(app.backend.saved_cart_writes(), 1);
  let saved = app.backend.load_saved_cart(user.id).await.unwrap().unwrap();
  assert_eq!(saved.items[0].quantity, 3);
}

#[tokio::test(start_paused = true)]
async fn anonymous_sessions_never_write() {
  let app = test_app();
  let whey = app.product("whey-vanilla", 3499, 10).await;

  let session = app.state.carts.get_or_create(Uuid::new_v4());
  session.add_item(whey.id, 2).await.unwrap();
  session.set_quantity(whey.id, 1).await.unwrap();
  assert!(!session.has_pending_sync());

  tokio::time::sleep(DEBOUNCE * 4).await;
  assert_eq!(app.backend.saved_cart_writes(), 0);
  assert_eq!(session.lines().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn signing_out_cancels_the_pending_write() {
  let app = test_app();
  let whey = app.product("whey-vanilla", 3499, 10).await;
  let user = app.user("dana@example.com", UserRole::Customer).await;

  let session = app.state.carts.get_or_create(Uuid::new_v4());
  session.sign_in(user.id).await;
  session.add_item(whey.id, 1).await.unwrap();
  session.sign_out();

  tokio::time::sleep(DEBOUNCE * 2).await;
  assert_eq!(app.backend.saved_cart_writes(), 0);
  assert_eq!(session.user_id(), None);
  // The local cart survives sign-out.
  assert_eq!(session.lines(), vec![CartLine { product_id: whey.id, quantity: 1 }]);
}

#[tokio::test(start_paused = true)]
async fn failed_writes_are_swallowed_and_later_edits_retry() {
  let app = test_app();
  let whey = app.product("whey-vanilla", 3499, 10).await;
  let user = app.user("dana@example.com", UserRole::Customer).await;

  let session = app.state.carts.get_or_create(Uuid::new_v4());
  session.sign_in(user.id).await;
  app.backend.set_fail_saved_cart_writes(true);
  session.add_item(whey.id, 1).await.unwrap();
  tokio::time::sleep(DEBOUNCE * 2).await;

  assert_eq!(app.backend.saved_cart_writes(), 1);
  assert!(app.backend.load_saved_cart(user.id).await.unwrap().is_none());
  assert_eq!(session.lines().len(), 1);

  app.backend.set_fail_saved_cart_writes(false);
  session.add_item(whey.id, 1).await.unwrap();
  tokio::time::sleep(DEBOUNCE * 2).await;

  let saved = app.backend.load_saved_cart(user.id).await.unwrap().unwrap();
  assert_eq!(saved.items, vec![CartLine { product_id: whey.id, quantity: 2 }]);
}

#[tokio::test(start_paused = true)]
async fn sign_in_merges_the_saved_cart_once() {
  let app = test_app();
  let whey = app.product("whey-vanilla", 3499, 10).await;
  let zinc = app.product("zinc", 599, 10).await;
  let omega = app.product("omega-3", 1299, 10).await;
  let user = app.user("dana@example.com", UserRole::Customer).await;

  app
    .backend
    .upsert_saved_cart(
      user.id,
      &[
        CartLine { product_id: whey.id, quantity: 5 },
        CartLine { product_id: omega.id, quantity: 1 },
      ],
    )
    .await
    .unwrap();
  let writes_before = app.backend.saved_cart_writes();

  let session = app.state.carts.get_or_create(Uuid::new_v4());
  session.add_item(whey.id, 1).await.unwrap();
  session.add_item(zinc.id, 3).await.unwrap();

  let merged = session.sign_in(user.id).await;
  assert!(session.is_reconciled());
  // Saved lines win for shared products; local-only lines are appended.
  assert_eq!(
    merged,
    vec![
      CartLine { product_id: whey.id, quantity: 5 },
      CartLine { product_id: omega.id, quantity: 1 },
      CartLine { product_id: zinc.id, quantity: 3 },
    ]
  );

  let again = session.sign_in(user.id).await;
  assert_eq!(again, merged);

  tokio::time::sleep(DEBOUNCE * 2).await;
  assert_eq!(app.backend.saved_cart_writes(), writes_before + 1);
  let saved = app.backend.load_saved_cart(user.id).await.unwrap().unwrap();
  assert_eq!(saved.items, merged);
}

#[tokio::test(start_paused = true)]
async fn carts_follow_the_user_to_a_second_device() {
  let app = test_app();
  let whey = app.product("whey-vanilla", 3499, 10).await;
  let user = app.user("dana@example.com", UserRole::Customer).await;

  let laptop = app.state.carts.get_or_create(Uuid::new_v4());
  laptop.sign_in(user.id).await;
  laptop.add_item(whey.id, 2).await.unwrap();
  tokio::time::sleep(DEBOUNCE * 2).await;

  let phone = app.state.carts.get_or_create(Uuid::new_v4());
  let lines = phone.sign_in(user.id).await;
  assert_eq!(lines, vec![CartLine { product_id: whey.id, quantity: 2 }]);
}

#[tokio::test(start_paused = true)]
async fn signing_in_as_someone_else_drops_the_previous_users_lines() {
  let app = test_app();
  let whey = app.product("whey-vanilla", 3499, 10).await;
  let zinc = app.product("zinc", 599, 10).await;
  let alice = app.user("alice@example.com", UserRole::Customer).await;
  let bob = app.user("bob@example.com", UserRole::Customer).await;
  app
    .backend
    .upsert_saved_cart(alice.id, &[CartLine { product_id: whey.id, quantity: 4 }])
    .await
    .unwrap();
  app
    .backend
    .upsert_saved_cart(bob.id, &[CartLine { product_id: zinc.id, quantity: 1 }])
    .await
    .unwrap();

  let session = app.state.carts.get_or_create(Uuid::new_v4());
  session.sign_in(alice.id).await;
  let lines = session.sign_in(bob.id).await;

  assert_eq!(lines, vec![CartLine { product_id: zinc.id, quantity: 1 }]);
  assert_eq!(session.user_id(), Some(bob.id));
  tokio::time::sleep(DEBOUNCE * 2).await;
  let bobs = app.backend.load_saved_cart(bob.id).await.unwrap().unwrap();
  assert_eq!(bobs.items, vec![CartLine { product_id: zinc.id, quantity: 1 }]);
  let alices = app.backend.load_saved_cart(alice.id).await.unwrap().unwrap();
  assert_eq!(alices.items, vec![CartLine { product_id: whey.id, quantity: 4 }]);
}

#[tokio::test(start_paused = true)]
async fn idle_sessions_are_purged_but_pending_writes_survive() {
  let app = test_app();
  let whey = app.product("whey-vanilla", 3499, 10).await;
  let user = app.user("dana@example.com", UserRole::Customer).await;
  let ttl = Duration::from_secs(60);

  for _ in 0..50 {
    app.state.carts.get_or_create(Uuid::new_v4()).clear();
  }
  let kept_id = Uuid::new_v4();
  app.state.carts.get_or_create(kept_id);
  assert_eq!(app.state.carts.len(), 51);

  tokio::time::sleep(ttl / 2).await;
  app.state.carts.get(kept_id).unwrap();
  tokio::time::sleep(ttl / 2).await;
  assert_eq!(app.state.carts.purge_idle(ttl), 50);
  assert_eq!(app.state.carts.len(), 1);

  // An idle session whose saved-cart write has not fired yet is not dropped.
  let signed_in = app.state.carts.get_or_create(Uuid::new_v4());
  signed_in.sign_in(user.id).await;
  signed_in.add_item(whey.id, 1).await.unwrap();
  assert_eq!(app.state.carts.purge_idle(Duration::ZERO), 1);
  assert!(app.state.carts.get(signed_in.id()).is_some());
  tokio::time::sleep(DEBOUNCE * 2).await;
  assert_eq!(app.backend.saved_cart_writes(), 1);
}
