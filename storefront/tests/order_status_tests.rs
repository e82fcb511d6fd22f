// tests/order_status_tests.rs
mod common;

use common::*;
use shopflow::{ContextData, PipelineResult, StepControl};
use storefront::errors::AppError;
use storefront::models::{InvoiceStatus, Order, OrderStatus, PaymentKind, Product, UserRole};
use storefront::pipelines::contexts::{CheckoutCtxData, OrderStatusCtxData, ShippingDetails};
use storefront::pipelines::order_status_pipeline::build_order_status_pipeline;
use storefront::store::{InvoiceStore, OrderStatusUpdate, OrderStore, StatusChange};
use uuid::Uuid;

async fn pending_order(app: &TestApp) -> (Order, Product) {
  let whey = app.product("whey-vanilla", 3499, 10).await;
  let user = app.user("dana@example.com", UserRole::Customer).await;
  let transfer = app.payment_method("bank_transfer", PaymentKind::BankTransfer).await;

  let cart_id = Uuid::new_v4();
  let session = app.state.carts.get_or_create(cart_id);
  session.add_item(whey.id, 3).await.unwrap();
  let ctx = ContextData::new(CheckoutCtxData::new(
    app.state.clone(),
    user,
    session,
    ShippingDetails {
      name: "Dana Reyes".to_string(),
      email: "dana@example.com".to_string(),
      address: "12 Harbour Road".to_string(),
    },
    transfer.id,
    None,
  ));
  app.state.flows.run(ctx.clone()).await.unwrap();
  let order = ctx.read().order.clone().unwrap();
  (order, whey)
}

async fn change_status(
  app: &TestApp,
  order_id: Uuid,
  status: OrderStatus,
  tracking: Option<&str>,
) -> Result<ContextData<OrderStatusCtxData>, AppError> {
  let mut initial = OrderStatusCtxData::new(app.state.clone(), order_id, status);
  initial.tracking_number = tracking.map(str::to_string);
  let ctx = ContextData::new(initial);
  let result = app.state.flows.run(ctx.clone()).await?;
  assert_eq!(result, PipelineResult::Completed);
  Ok(ctx)
}

#[tokio::test]
async fn order_moves_through_fulfilment() {
  let app = test_app();
  let (order, _) = pending_order(&app).await;

  let ctx = change_status(&app, order.id, OrderStatus::Paid, None).await.unwrap();
  assert_eq!(ctx.read().previous_status, Some(OrderStatus::Pending));
  assert_eq!(ctx.read().invoice.as_ref().unwrap().status, InvoiceStatus::Paid);

  change_status(&app, order.id, OrderStatus::Processing, None).await.unwrap();
  let ctx = change_status(&app, order.id, OrderStatus::Shipped, Some("TRK-1042")).await.unwrap();
  assert!(ctx.read().customer_notified);
  change_status(&app, order.id, OrderStatus::Delivered, None).await.unwrap();

  let stored = app.backend.get_order(order.id).await.unwrap().unwrap();
  assert_eq!(stored.status, OrderStatus::Delivered);
  assert_eq!(stored.tracking_number.as_deref(), Some("TRK-1042"));
  assert!(app.mailer.sent().iter().any(|m| m.body.contains("TRK-1042")));
}

#[tokio::test]
async fn invalid_transitions_are_rejected() {
  let app = test_app();
  let (order, _) = pending_order(&app).await;

  let err = change_status(&app, order.id, OrderStatus::Shipped, None).await.unwrap_err();
  assert!(matches!(err, AppError::Validation(_)));

  let err = change_status(&app, Uuid::new_v4(), OrderStatus::Paid, None).await.unwrap_err();
  assert!(matches!(err, AppError::NotFound(_)));

  let stored = app.backend.get_order(order.id).await.unwrap().unwrap();
  assert_eq!(stored.status, OrderStatus::Pending);
}

#[tokio::test]
async fn cancelling_restocks_and_voids_the_invoice() {
  let app = test_app();
  let (order, whey) = pending_order(&app).await;
  assert_eq!(app.stock_of(&whey).await, 7);

  let ctx = change_status(&app, order.id, OrderStatus::Cancelled, None).await.unwrap();
  assert_eq!(ctx.read().restocked_units, 3);
  assert_eq!(app.stock_of(&whey).await, 10);

  let invoice = app.backend.invoice_for_order(order.id).await.unwrap().unwrap();
  assert_eq!(invoice.status, InvoiceStatus::Void);

  // Cancelled is terminal.
  let err = change_status(&app, order.id, OrderStatus::Paid, None).await.unwrap_err();
  assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn cancel_that_loses_a_race_neither_succeeds_nor_restocks() {
  let app = test_app();
  let (order, whey) = pending_order(&app).await;
  change_status(&app, order.id, OrderStatus::Paid, None).await.unwrap();

  // Another admin's cancel lands between this run's validation and its write.
  let mut pipeline = build_order_status_pipeline();
  let backend = app.backend.clone();
  let order_id = order.id;
  pipeline.before_step("persist_order_status", move |_ctx: ContextData<OrderStatusCtxData>| {
    let backend = backend.clone();
    async move {
      let change = backend
        .update_order_status(order_id, OrderStatus::Paid, OrderStatus::Cancelled, &OrderStatusUpdate::default())
        .await?;
      assert!(matches!(change, StatusChange::Applied(_)));
      Ok::<_, AppError>(StepControl::Continue)
    }
  });

  let ctx = ContextData::new(OrderStatusCtxData::new(app.state.clone(), order.id, OrderStatus::Cancelled));
  let err = pipeline.run(ctx.clone()).await.unwrap_err();

  assert!(matches!(err, AppError::Conflict(_)));
  assert_eq!(ctx.read().restocked_units, 0);
  assert_eq!(app.stock_of(&whey).await, 7);
}

#[tokio::test]
async fn status_write_is_conditional_on_the_expected_status() {
  let app = test_app();
  let (order, _) = pending_order(&app).await;
  let update = OrderStatusUpdate::default();

  let first = app
    .backend
    .update_order_status(order.id, OrderStatus::Pending, OrderStatus::Cancelled, &update)
    .await
    .unwrap();
  assert!(matches!(first, StatusChange::Applied(ref o) if o.status == OrderStatus::Cancelled));

  let second = app
    .backend
    .update_order_status(order.id, OrderStatus::Pending, OrderStatus::Cancelled, &update)
    .await
    .unwrap();
  assert_eq!(second, StatusChange::Stale { current: OrderStatus::Cancelled });

  let missing = app
    .backend
    .update_order_status(Uuid::new_v4(), OrderStatus::Pending, OrderStatus::Paid, &update)
    .await
    .unwrap();
  assert_eq!(missing, StatusChange::NotFound);
}
