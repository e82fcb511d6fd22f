// tests/admin_tests.rs
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
    actix_test::init_service(
      App::new()
        .app_data(web::Data::new($app.state.clone()))
        .configure(|cfg| configure_app_routes(cfg, true)),
    )
    .await
  };
}

fn bearer(token: &str) -> (&'static str, String) {
  ("Authorization", format!("Bearer {}", token))
}

#[actix_web::test]
async fn product_lifecycle_and_inventory() {
  let app = test_app();
  let admin = app.user("admin@example.com", UserRole::Admin).await;
  let token = app.token_for(&admin);
  let srv = service!(app);

  let product = json!({
    "slug": "electrolyte-mix",
    "name": "Electrolyte Mix",
    "category": "hydration",
    "price_cents": 1599,
    "stock_quantity": 3,
  });
  let req = actix_test::TestRequest::post()
    .uri("/api/v1/admin/products")
    .insert_header(bearer(&token))
    .set_json(&product)
    .to_request();
  let resp = actix_test::call_service(&srv, req).await;
  assert_eq!(resp.status(), StatusCode::CREATED);
  let body: Value = actix_test::read_body_json(resp).await;
  let product_id = body["product"]["id"].as_str().unwrap().to_string();

  let req = actix_test::TestRequest::post()
    .uri("/api/v1/admin/products")
    .insert_header(bearer(&token))
    .set_json(&product)
    .to_request();
  assert_eq!(actix_test::call_service(&srv, req).await.status(), StatusCode::CONFLICT);

  let req = actix_test::TestRequest::get()
    .uri("/api/v1/admin/inventory/low-stock")
    .insert_header(bearer(&token))
    .to_request();
  let body: Value = actix_test::call_and_read_body_json(&srv, req).await;
  assert_eq!(body["threshold"], 5);
  assert_eq!(body["products"].as_array().unwrap().len(), 1);

  let req = actix_test::TestRequest::post()
    .uri(&format!("/api/v1/admin/products/{}/stock/adjust", product_id))
    .insert_header(bearer(&token))
    .set_json(json!({ "delta": -4 }))
    .to_request();
  assert_eq!(actix_test::call_service(&srv, req).await.status(), StatusCode::BAD_REQUEST);

  let req = actix_test::TestRequest::post()
    .uri(&format!("/api/v1/admin/products/{}/stock/adjust", product_id))
    .insert_header(bearer(&token))
    .set_json(json!({ "delta": 10 }))
    .to_request();
  let body: Value = actix_test::call_and_read_body_json(&srv, req).await;
  assert_eq!(body["product"]["stock_quantity"], 13);

  let req = actix_test::TestRequest::put()
    .uri(&format!("/api/v1/admin/products/{}/stock", product_id))
    .insert_header(bearer(&token))
    .set_json(json!({ "quantity": -1 }))
    .to_request();
  assert_eq!(actix_test::call_service(&srv, req).await.status(), StatusCode::BAD_REQUEST);

  let req = actix_test::TestRequest::delete()
    .uri(&format!("/api/v1/admin/products/{}", product_id))
    .insert_header(bearer(&token))
    .to_request();
  let body: Value = actix_test::call_and_read_body_json(&srv, req).await;
  assert_eq!(body["product"]["is_active"], false);

  let req = actix_test::TestRequest::get().uri("/api/v1/products").to_request();
  let body: Value = actix_test::call_and_read_body_json(&srv, req).await;
  assert!(body["products"].as_array().unwrap().is_empty());

  let req = actix_test::TestRequest::get()
    .uri("/api/v1/admin/products")
    .insert_header(bearer(&token))
    .to_request();
  let body: Value = actix_test::call_and_read_body_json(&srv, req).await;
  assert_eq!(body["products"].as_array().unwrap().len(), 1);
}

#[actix_web::test]
async fn catalog_seed_upserts_by_slug() {
  let app = test_app();
  let admin = app.user("admin@example.com", UserRole::Admin).await;
  let token = app.token_for(&admin);
  let existing = app.product("whey-vanilla", 3499, 7).await;
  let srv = service!(app);

  let req = actix_test::TestRequest::post()
    .uri("/api/v1/admin/catalog/seed")
    .insert_header(bearer(&token))
    .set_json(json!({ "products": [
      { "slug": "whey-vanilla", "name": "Whey Vanilla 2kg", "price_cents": 5999, "stock_quantity": 50 },
      { "slug": "zinc", "name": "Zinc", "price_cents": 599, "stock_quantity": 20 },
      { "slug": "Bad Slug", "name": "Broken", "price_cents": 100 }
    ]}))
    .to_request();
  let body: Value = actix_test::call_and_read_body_json(&srv, req).await;
  assert_eq!(body["report"]["inserted"], 1);
  assert_eq!(body["report"]["updated"], 1);
  assert_eq!(body["report"]["skipped"], json!(["Bad Slug"]));

  let updated = app.backend.get_product(existing.id).await.unwrap().unwrap();
  assert_eq!(updated.name, "Whey Vanilla 2kg");
  assert_eq!(updated.price_cents, 5999);
  // Stock is only set on insert.
  assert_eq!(updated.stock_quantity, 7);
}

#[actix_web::test]
async fn discounts_invoices_and_order_status() {
  let app = test_app();
  let admin = app.user("admin@example.com", UserRole::Admin).await;
  let customer = app.user("dana@example.com", UserRole::Customer).await;
  let whey = app.product("whey-vanilla", 3499, 10).await;
  let transfer = app.payment_method("bank_transfer", PaymentKind::BankTransfer).await;
  let (admin_token, customer_token) = (app.token_for(&admin), app.token_for(&customer));
  let srv = service!(app);

  let req = actix_test::TestRequest::post()
    .uri("/api/v1/admin/discounts")
    .insert_header(bearer(&admin_token))
    .set_json(json!({ "code": "welcome5", "kind": "fixed", "value": 500 }))
    .to_request();
  let body: Value = actix_test::call_and_read_body_json(&srv, req).await;
  assert_eq!(body["discount"]["code"], "WELCOME5");
  let discount_id = body["discount"]["id"].as_str().unwrap().to_string();

  let req = actix_test::TestRequest::post()
    .uri("/api/v1/admin/discounts")
    .insert_header(bearer(&admin_token))
    .set_json(json!({ "code": "toomuch", "kind": "percent", "value": 120 }))
    .to_request();
  assert_eq!(actix_test::call_service(&srv, req).await.status(), StatusCode::BAD_REQUEST);

  let cart_id = Uuid::new_v4();
  app.state.carts.get_or_create(cart_id).add_item(whey.id, 1).await.unwrap();
  let req = actix_test::TestRequest::post()
    .uri("/api/v1/checkout")
    .insert_header(("X-Cart-Session", cart_id.to_string()))
    .insert_header(bearer(&customer_token))
    .set_json(json!({
      "shipping": { "name": "Dana", "email": "dana@example.com", "address": "12 Harbour Road" },
      "payment_method_id": transfer.id,
      "discount_code": "welcome5",
    }))
    .to_request();
  let body: Value = actix_test::call_and_read_body_json(&srv, req).await;
  assert_eq!(body["order"]["total_cents"], 2999);
  let order_id = body["order"]["id"].as_str().unwrap().to_string();
  let invoice_id = body["invoice"]["id"].as_str().unwrap().to_string();

  let req = actix_test::TestRequest::post()
    .uri(&format!("/api/v1/admin/discounts/{}/deactivate", discount_id))
    .insert_header(bearer(&admin_token))
    .to_request();
  let body: Value = actix_test::call_and_read_body_json(&srv, req).await;
  assert_eq!(body["discount"]["is_active"], false);
  assert_eq!(body["discount"]["used_count"], 1);

  let req = actix_test::TestRequest::get()
    .uri("/api/v1/admin/orders?status=pending")
    .insert_header(bearer(&admin_token))
    .to_request();
  let body: Value = actix_test::call_and_read_body_json(&srv, req).await;
  assert_eq!(body["orders"].as_array().unwrap().len(), 1);

  let req = actix_test::TestRequest::post()
    .uri(&format!("/api/v1/admin/orders/{}/status", order_id))
    .insert_header(bearer(&admin_token))
    .set_json(json!({ "status": "delivered" }))
    .to_request();
  assert_eq!(actix_test::call_service(&srv, req).await.status(), StatusCode::BAD_REQUEST);

  let req = actix_test::TestRequest::post()
    .uri(&format!("/api/v1/admin/orders/{}/status", order_id))
    .insert_header(bearer(&admin_token))
    .set_json(json!({ "status": "paid", "payment_reference": "bank-ref-77" }))
    .to_request();
  let body: Value = actix_test::call_and_read_body_json(&srv, req).await;
  assert_eq!(body["order"]["status"], "paid");
  assert_eq!(body["previousStatus"], "pending");
  assert_eq!(body["invoice"]["status"], "paid");

  // Already paid through the status change.
  let req = actix_test::TestRequest::post()
    .uri(&format!("/api/v1/admin/invoices/{}/pay", invoice_id))
    .insert_header(bearer(&admin_token))
    .to_request();
  assert_eq!(actix_test::call_service(&srv, req).await.status(), StatusCode::BAD_REQUEST);

  let req = actix_test::TestRequest::post()
    .uri(&format!("/api/v1/admin/invoices/{}/void", invoice_id))
    .insert_header(bearer(&admin_token))
    .to_request();
  let body: Value = actix_test::call_and_read_body_json(&srv, req).await;
  assert_eq!(body["invoice"]["status"], "void");

  let req = actix_test::TestRequest::get()
    .uri("/api/v1/admin/invoices")
    .insert_header(bearer(&admin_token))
    .to_request();
  let body: Value = actix_test::call_and_read_body_json(&srv, req).await;
  assert!(body["invoices"][0]["number"].as_str().unwrap().starts_with("INV-"));
}

#[actix_web::test]
async fn roles_and_payment_methods() {
  let app = test_app();
  let admin = app.user("admin@example.com", UserRole::Admin).await;
  let customer = app.user("nina@example.com", UserRole::Customer).await;
  let token = app.token_for(&admin);
  let srv = service!(app);

  let req = actix_test::TestRequest::put()
    .uri(&format!("/api/v1/admin/users/{}/role", customer.id))
    .insert_header(bearer(&token))
    .set_json(json!({ "role": "nutritionist" }))
    .to_request();
  let body: Value = actix_test::call_and_read_body_json(&srv, req).await;
  assert_eq!(body["user"]["role"], "nutritionist");

  let req = actix_test::TestRequest::put()
    .uri(&format!("/api/v1/admin/users/{}/role", admin.id))
    .insert_header(bearer(&token))
    .set_json(json!({ "role": "customer" }))
    .to_request();
  assert_eq!(actix_test::call_service(&srv, req).await.status(), StatusCode::BAD_REQUEST);

  let req = actix_test::TestRequest::post()
    .uri("/api/v1/admin/payment-methods")
    .insert_header(bearer(&token))
    .set_json(json!({ "code": "cod", "name": "Cash on delivery", "kind": "cash_on_delivery", "is_active": false }))
    .to_request();
  let resp = actix_test::call_service(&srv, req).await;
  assert_eq!(resp.status(), StatusCode::CREATED);
  let body: Value = actix_test::read_body_json(resp).await;
  let method_id = body["paymentMethod"]["id"].as_str().unwrap().to_string();

  let req = actix_test::TestRequest::get().uri("/api/v1/payment-methods").to_request();
  let body: Value = actix_test::call_and_read_body_json(&srv, req).await;
  assert!(body["paymentMethods"].as_array().unwrap().is_empty());

  let req = actix_test::TestRequest::put()
    .uri(&format!("/api/v1/admin/payment-methods/{}", method_id))
    .insert_header(bearer(&token))
    .set_json(json!({ "code": "cod", "name": "Cash on delivery", "kind": "cash_on_delivery" }))
    .to_request();
  assert_eq!(actix_test::call_service(&srv, req).await.status(), StatusCode::OK);

  let req = actix_test::TestRequest::get().uri("/api/v1/payment-methods").to_request();
  let body: Value = actix_test::call_and_read_body_json(&srv, req).await;
  assert_eq!(body["paymentMethods"].as_array().unwrap().len(), 1);
}
