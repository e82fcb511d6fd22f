// tests/http_tests.rs
mod common;

use actix_web::http::StatusCode;
use actix_web::{test as actix_test, web, App};
use common::*;
use serde_json::{json, Value};
use storefront::models::{PaymentKind, UserRole};
use storefront::store::CatalogStore;
use storefront::web::configure_app_routes;
use uuid::Uuid;

macro_rules! service {
  ($app:expr) => {
    service!($app, true)
  };
  ($app:expr, $appointments:expr) => {
    actix_test::init_service(
      App::new()
        .app_data(web::Data::new($app.state.clone()))
        .configure(|cfg| configure_app_routes(cfg, $appointments)),
    )
    .await
  };
}

fn bearer(token: &str) -> (&'static str, String) {
  ("Authorization", format!("Bearer {}", token))
}

fn cart_header(id: Uuid) -> (&'static str, String) {
  ("X-Cart-Session", id.to_string())
}

#[actix_web::test]
async fn signup_signin_me_signout() {
  let app = test_app();
  let srv = service!(app);

  let req = actix_test::TestRequest::post()
    .uri("/api/v1/auth/signup")
    .set_json(json!({ "email": "Dana@Example.com", "password": PASSWORD, "full_name": "Dana" }))
    .to_request();
  let resp = actix_test::call_service(&srv, req).await;
  assert_eq!(resp.status(), StatusCode::CREATED);
  let body: Value = actix_test::read_body_json(resp).await;
  assert_eq!(body["user"]["email"], "dana@example.com");
  assert!(body["user"].get("password_hash").is_none());

  let req = actix_test::TestRequest::post()
    .uri("/api/v1/auth/signup")
    .set_json(json!({ "email": "dana@example.com", "password": PASSWORD }))
    .to_request();
  assert_eq!(actix_test::call_service(&srv, req).await.status(), StatusCode::CONFLICT);

  let req = actix_test::TestRequest::post()
    .uri("/api/v1/auth/signin")
    .set_json(json!({ "email": "dana@example.com", "password": "wrong-password" }))
    .to_request();
  assert_eq!(actix_test::call_service(&srv, req).await.status(), StatusCode::UNAUTHORIZED);

  let req = actix_test::TestRequest::post()
    .uri("/api/v1/auth/signin")
    .set_json(json!({ "email": "dana@example.com", "password": PASSWORD }))
    .to_request();
  let body: Value = actix_test::call_and_read_body_json(&srv, req).await;
  let token = body["token"].as_str().unwrap().to_string();

  let req = actix_test::TestRequest::get()
    .uri("/api/v1/auth/me")
    .insert_header(bearer(&token))
    .to_request();
  let body: Value = actix_test::call_and_read_body_json(&srv, req).await;
  assert_eq!(body["user"]["email"], "dana@example.com");

  let req = actix_test::TestRequest::post()
    .uri("/api/v1/auth/signout")
    .insert_header(bearer(&token))
    .to_request();
  assert_eq!(actix_test::call_service(&srv, req).await.status(), StatusCode::OK);

  let req = actix_test::TestRequest::get()
    .uri("/api/v1/auth/me")
    .insert_header(bearer(&token))
    .to_request();
  assert_eq!(actix_test::call_service(&srv, req).await.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn cart_endpoints_require_a_valid_session_header() {
  let app = test_app();
  let whey = app.product("whey-vanilla", 3499, 4).await;
  let srv = service!(app);

  let req = actix_test::TestRequest::get().uri("/api/v1/cart").to_request();
  assert_eq!(actix_test::call_service(&srv, req).await.status(), StatusCode::BAD_REQUEST);

  let req = actix_test::TestRequest::get()
    .uri("/api/v1/cart")
    .insert_header(("X-Cart-Session", "not-a-uuid"))
    .to_request();
  assert_eq!(actix_test::call_service(&srv, req).await.status(), StatusCode::BAD_REQUEST);

  let cart_id = Uuid::new_v4();
  let req = actix_test::TestRequest::post()
    .uri("/api/v1/cart/items")
    .insert_header(cart_header(cart_id))
    .set_json(json!({ "product_id": whey.id, "quantity": 3 }))
    .to_request();
  let body: Value = actix_test::call_and_read_body_json(&srv, req).await;
  assert_eq!(body["cart"]["itemCount"], 3);
  assert_eq!(body["cart"]["subtotalCents"], 3 * 3499);

  let req = actix_test::TestRequest::post()
    .uri("/api/v1/cart/items")
    .insert_header(cart_header(cart_id))
    .set_json(json!({ "product_id": whey.id, "quantity": 2 }))
    .to_request();
  assert_eq!(actix_test::call_service(&srv, req).await.status(), StatusCode::BAD_REQUEST);

  let req = actix_test::TestRequest::put()
    .uri(&format!("/api/v1/cart/items/{}", whey.id))
    .insert_header(cart_header(cart_id))
    .set_json(json!({ "quantity": 1 }))
    .to_request();
  let body: Value = actix_test::call_and_read_body_json(&srv, req).await;
  assert_eq!(body["cart"]["lines"][0]["quantity"], 1);

  let req = actix_test::TestRequest::delete()
    .uri(&format!("/api/v1/cart/items/{}", whey.id))
    .insert_header(cart_header(cart_id))
    .to_request();
  let body: Value = actix_test::call_and_read_body_json(&srv, req).await;
  assert_eq!(body["cart"]["lines"].as_array().unwrap().len(), 0);

  let req = actix_test::TestRequest::post()
    .uri("/api/v1/cart/items")
    .insert_header(cart_header(cart_id))
    .set_json(json!({ "product_id": Uuid::new_v4() }))
    .to_request();
  assert_eq!(actix_test::call_service(&srv, req).await.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn products_are_filtered_and_inactive_ones_hidden() {
  let app = test_app();
  app.product("whey-vanilla", 3499, 4).await;
  app.product("whey-chocolate", 2999, 0).await;
  let zinc = app.product("zinc", 599, 10).await;
  let srv = service!(app);

  let req = actix_test::TestRequest::get()
    .uri("/api/v1/products?search=WHEY&in_stock=true")
    .to_request();
  let body: Value = actix_test::call_and_read_body_json(&srv, req).await;
  let products = body["products"].as_array().unwrap();
  assert_eq!(products.len(), 1);
  assert_eq!(products[0]["slug"], "whey-vanilla");

  let req = actix_test::TestRequest::get()
    .uri("/api/v1/products?sort=price_asc")
    .to_request();
  let body: Value = actix_test::call_and_read_body_json(&srv, req).await;
  assert_eq!(body["products"][0]["slug"], "zinc");

  let req = actix_test::TestRequest::get()
    .uri("/api/v1/products?min_price_cents=5000&max_price_cents=100")
    .to_request();
  assert_eq!(actix_test::call_service(&srv, req).await.status(), StatusCode::BAD_REQUEST);

  app.backend.set_product_active(zinc.id, false).await.unwrap();
  let req = actix_test::TestRequest::get()
    .uri(&format!("/api/v1/products/{}", zinc.id))
    .to_request();
  assert_eq!(actix_test::call_service(&srv, req).await.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn declined_checkout_answers_payment_required() {
  let app = test_app();
  let whey = app.product("whey-vanilla", 2123, 5).await;
  let card = app.payment_method("card", PaymentKind::Card).await;
  let user = app.user("dana@example.com", UserRole::Customer).await;
  let token = app.token_for(&user);
  let srv = service!(app);

  let cart_id = Uuid::new_v4();
  let req = actix_test::TestRequest::post()
    .uri("/api/v1/cart/items")
    .insert_header(cart_header(cart_id))
    .set_json(json!({ "product_id": whey.id, "quantity": 1 }))
    .to_request();
  assert_eq!(actix_test::call_service(&srv, req).await.status(), StatusCode::OK);

  let checkout_body = json!({
    "shipping": { "name": "Dana", "email": "dana@example.com", "address": "12 Harbour Road" },
    "payment_method_id": card.id,
  });

  let req = actix_test::TestRequest::post()
    .uri("/api/v1/checkout")
    .insert_header(cart_header(cart_id))
    .set_json(&checkout_body)
    .to_request();
  assert_eq!(actix_test::call_service(&srv, req).await.status(), StatusCode::UNAUTHORIZED);

  let req = actix_test::TestRequest::post()
    .uri("/api/v1/checkout")
    .insert_header(cart_header(cart_id))
    .insert_header(bearer(&token))
    .set_json(&checkout_body)
    .to_request();
  let resp = actix_test::call_service(&srv, req).await;
  assert_eq!(resp.status(), StatusCode::PAYMENT_REQUIRED);
  assert_eq!(app.stock_of(&whey).await, 5);
}

#[actix_web::test]
async fn customers_see_only_their_own_orders() {
  let app = test_app();
  let whey = app.product("whey-vanilla", 3499, 5).await;
  let transfer = app.payment_method("bank_transfer", PaymentKind::BankTransfer).await;
  let dana = app.user("dana@example.com", UserRole::Customer).await;
  let sam = app.user("sam@example.com", UserRole::Customer).await;
  let admin = app.user("admin@example.com", UserRole::Admin).await;
  let (dana_token, sam_token, admin_token) = (app.token_for(&dana), app.token_for(&sam), app.token_for(&admin));
  let srv = service!(app);

  let cart_id = Uuid::new_v4();
  let req = actix_test::TestRequest::post()
    .uri("/api/v1/cart/items")
    .insert_header(cart_header(cart_id))
    .set_json(json!({ "product_id": whey.id, "quantity": 2 }))
    .to_request();
  actix_test::call_service(&srv, req).await;

  let req = actix_test::TestRequest::post()
    .uri("/api/v1/checkout")
    .insert_header(cart_header(cart_id))
    .insert_header(bearer(&dana_token))
    .set_json(json!({
      "shipping": { "name": "Dana", "email": "dana@example.com", "address": "12 Harbour Road" },
      "payment_method_id": transfer.id,
    }))
    .to_request();
  let resp = actix_test::call_service(&srv, req).await;
  assert_eq!(resp.status(), StatusCode::CREATED);
  let body: Value = actix_test::read_body_json(resp).await;
  let order_id = body["order"]["id"].as_str().unwrap().to_string();
  assert_eq!(body["invoice"]["status"], "issued");

  let req = actix_test::TestRequest::get()
    .uri("/api/v1/orders")
    .insert_header(bearer(&dana_token))
    .to_request();
  let body: Value = actix_test::call_and_read_body_json(&srv, req).await;
  assert_eq!(body["orders"].as_array().unwrap().len(), 1);

  let uri = format!("/api/v1/orders/{}", order_id);
  let req = actix_test::TestRequest::get().uri(&uri).insert_header(bearer(&sam_token)).to_request();
  assert_eq!(actix_test::call_service(&srv, req).await.status(), StatusCode::NOT_FOUND);

  let req = actix_test::TestRequest::get().uri(&uri).insert_header(bearer(&admin_token)).to_request();
  let body: Value = actix_test::call_and_read_body_json(&srv, req).await;
  assert_eq!(body["items"][0]["quantity"], 2);
}

#[actix_web::test]
async fn admin_routes_require_the_admin_role() {
  let app = test_app();
  let customer = app.user("dana@example.com", UserRole::Customer).await;
  let admin = app.user("admin@example.com", UserRole::Admin).await;
  let (customer_token, admin_token) = (app.token_for(&customer), app.token_for(&admin));
  let srv = service!(app);

  let req = actix_test::TestRequest::get().uri("/api/v1/admin/users").to_request();
  assert_eq!(actix_test::call_service(&srv, req).await.status(), StatusCode::UNAUTHORIZED);

  let req = actix_test::TestRequest::get()
    .uri("/api/v1/admin/users")
    .insert_header(bearer(&customer_token))
    .to_request();
  assert_eq!(actix_test::call_service(&srv, req).await.status(), StatusCode::FORBIDDEN);

  let req = actix_test::TestRequest::get()
    .uri("/api/v1/admin/users")
    .insert_header(bearer(&admin_token))
    .to_request();
  let body: Value = actix_test::call_and_read_body_json(&srv, req).await;
  assert_eq!(body["users"].as_array().unwrap().len(), 2);
}

#[actix_web::test]
async fn appointment_routes_are_absent_when_disabled() {
  let app = test_app();
  let srv = service!(app, false);

  let req = actix_test::TestRequest::get().uri("/api/v1/appointments/slots").to_request();
  assert_eq!(actix_test::call_service(&srv, req).await.status(), StatusCode::NOT_FOUND);

  let req = actix_test::TestRequest::get().uri("/api/v1/health").to_request();
  assert_eq!(actix_test::call_service(&srv, req).await.status(), StatusCode::OK);
}

#[actix_web::test]
async fn a_signed_in_cart_answers_only_to_its_owner() {
  let app = test_app();
  let whey = app.product("whey-vanilla", 3499, 10).await;
  let transfer = app.payment_method("bank_transfer", PaymentKind::BankTransfer).await;
  app.user("alice@example.com", UserRole::Customer).await;
  let bob = app.user("bob@example.com", UserRole::Customer).await;
  let bob_token = app.token_for(&bob);
  let srv = service!(app);

  let cart_id = Uuid::new_v4();
  let req = actix_test::TestRequest::post()
    .uri("/api/v1/cart/items")
    .insert_header(cart_header(cart_id))
    .set_json(json!({ "product_id": whey.id, "quantity": 2 }))
    .to_request();
  assert_eq!(actix_test::call_service(&srv, req).await.status(), StatusCode::OK);

  let req = actix_test::TestRequest::post()
    .uri("/api/v1/auth/signin")
    .insert_header(cart_header(cart_id))
    .set_json(json!({ "email": "alice@example.com", "password": PASSWORD }))
    .to_request();
  let body: Value = actix_test::call_and_read_body_json(&srv, req).await;
  let alice_token = body["token"].as_str().unwrap().to_string();

  // Anonymous callers can no longer touch the cart.
  let req = actix_test::TestRequest::delete()
    .uri("/api/v1/cart")
    .insert_header(cart_header(cart_id))
    .to_request();
  assert_eq!(actix_test::call_service(&srv, req).await.status(), StatusCode::UNAUTHORIZED);
  let req = actix_test::TestRequest::post()
    .uri("/api/v1/cart/items")
    .insert_header(cart_header(cart_id))
    .set_json(json!({ "product_id": whey.id }))
    .to_request();
  assert_eq!(actix_test::call_service(&srv, req).await.status(), StatusCode::UNAUTHORIZED);

  // Another user sees nothing there.
  let req = actix_test::TestRequest::get()
    .uri("/api/v1/cart")
    .insert_header(cart_header(cart_id))
    .insert_header(bearer(&bob_token))
    .to_request();
  assert_eq!(actix_test::call_service(&srv, req).await.status(), StatusCode::NOT_FOUND);
  let req = actix_test::TestRequest::put()
    .uri(&format!("/api/v1/cart/items/{}", whey.id))
    .insert_header(cart_header(cart_id))
    .insert_header(bearer(&bob_token))
    .set_json(json!({ "quantity": 1 }))
    .to_request();
  assert_eq!(actix_test::call_service(&srv, req).await.status(), StatusCode::NOT_FOUND);
  let req = actix_test::TestRequest::post()
    .uri("/api/v1/checkout")
    .insert_header(cart_header(cart_id))
    .insert_header(bearer(&bob_token))
    .set_json(json!({
      "shipping": { "name": "Bob", "email": "bob@example.com", "address": "3 Quay Street" },
      "payment_method_id": transfer.id,
    }))
    .to_request();
  assert_eq!(actix_test::call_service(&srv, req).await.status(), StatusCode::NOT_FOUND);
  assert_eq!(app.stock_of(&whey).await, 10);

  let req = actix_test::TestRequest::post()
    .uri("/api/v1/cart/items")
    .insert_header(cart_header(cart_id))
    .insert_header(bearer(&alice_token))
    .set_json(json!({ "product_id": whey.id }))
    .to_request();
  let body: Value = actix_test::call_and_read_body_json(&srv, req).await;
  assert_eq!(body["cart"]["itemCount"], 3);
}

#[actix_web::test]
async fn removing_from_an_unknown_cart_does_not_create_it() {
  let app = test_app();
  let srv = service!(app);

  let req = actix_test::TestRequest::delete()
    .uri(&format!("/api/v1/cart/items/{}", Uuid::new_v4()))
    .insert_header(cart_header(Uuid::new_v4()))
    .to_request();
  let body: Value = actix_test::call_and_read_body_json(&srv, req).await;
  assert_eq!(body["cart"]["itemCount"], 0);

  let req = actix_test::TestRequest::delete()
    .uri("/api/v1/cart")
    .insert_header(cart_header(Uuid::new_v4()))
    .to_request();
  assert_eq!(actix_test::call_service(&srv, req).await.status(), StatusCode::OK);
  assert!(app.state.carts.is_empty());
}
