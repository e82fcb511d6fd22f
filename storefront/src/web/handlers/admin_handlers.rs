// storefront/src/web/handlers/admin_handlers.rs

//! Back-office endpoints. Every handler requires the admin role.

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use shopflow::{ContextData, PipelineResult};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::catalog::{self, seed_catalog};
use crate::errors::AppError;
use crate::models::{
  DiscountCode, DiscountInput, InvoiceStatus, OrderStatus, PaymentMethodInput, ProductInput, UserRole,
};
use crate::pipelines::contexts::OrderStatusCtxData;
use crate::state::AppState;
use crate::store::{
  CatalogStore, DiscountStore, InvoiceStore, OrderStore, PaymentMethodStore, StockChange, UserStore,
};
use crate::web::extractors::AdminUser;

#[derive(Deserialize, Debug)]
pub struct SetStockPayload {
  pub quantity: i32,
}

#[derive(Deserialize, Debug)]
pub struct AdjustStockPayload {
  pub delta: i32,
}

#[derive(Deserialize, Debug)]
pub struct LowStockQuery {
  pub threshold: Option<i32>,
}

#[derive(Deserialize, Debug)]
pub struct OrderListQuery {
  pub status: Option<OrderStatus>,
}

#[derive(Deserialize, Debug)]
pub struct OrderStatusPayload {
  pub status: OrderStatus,
  pub tracking_number: Option<String>,
  pub payment_reference: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct RolePayload {
  pub role: UserRole,
}

/// Body of the seeding endpoint. Without `products` the configured seed file is loaded.
#[derive(Deserialize, Debug, Default)]
pub struct SeedPayload {
  pub products: Option<Vec<ProductInput>>,
}

// --- Products and inventory ---

#[instrument(name = "handler::admin_list_products", skip_all, fields(admin_id = %admin.0.id))]
pub async fn list_products_handler(app_state: web::Data<AppState>, admin: AdminUser) -> Result<HttpResponse, AppError> {
  let products = app_state.backend.list_products(true).await?;
  Ok(HttpResponse::Ok().json(json!({ "products": products })))
}

#[instrument(name = "handler::admin_create_product", skip_all, fields(admin_id = %admin.0.id, slug = %req_payload.slug))]
pub async fn create_product_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  req_payload: web::Json<ProductInput>,
) -> Result<HttpResponse, AppError> {
  req_payload.validate().map_err(AppError::Validation)?;
  let product = app_state.backend.insert_product(&req_payload).await?;
  info!(product_id = %product.id, "Product created.");
  Ok(HttpResponse::Created().json(json!({ "product": product })))
}

#[instrument(name = "handler::admin_update_product", skip_all, fields(admin_id = %admin.0.id, product_id = %path.as_ref()))]
pub async fn update_product_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  path: web::Path<Uuid>,
  req_payload: web::Json<ProductInput>,
) -> Result<HttpResponse, AppError> {
  let product_id = path.into_inner();
  req_payload.validate().map_err(AppError::Validation)?;
  let product = app_state
    .backend
    .update_product(product_id, &req_payload)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Product {} not found.", product_id)))?;
  info!("Product updated.");
  Ok(HttpResponse::Ok().json(json!({ "product": product })))
}

#[instrument(name = "handler::admin_deactivate_product", skip_all, fields(admin_id = %admin.0.id, product_id = %path.as_ref()))]
pub async fn deactivate_product_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let product_id = path.into_inner();
  let product = app_state
    .backend
    .set_product_active(product_id, false)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Product {} not found.", product_id)))?;
  info!("Product deactivated.");
  Ok(HttpResponse::Ok().json(json!({ "product": product })))
}

#[instrument(name = "handler::admin_set_stock", skip_all, fields(admin_id = %admin.0.id, product_id = %path.as_ref()))]
pub async fn set_stock_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  path: web::Path<Uuid>,
  req_payload: web::Json<SetStockPayload>,
) -> Result<HttpResponse, AppError> {
  let product_id = path.into_inner();
  if req_payload.quantity < 0 {
    return Err(AppError::Validation("Stock cannot be negative.".to_string()));
  }
  let product = app_state
    .backend
    .set_stock(product_id, req_payload.quantity)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Product {} not found.", product_id)))?;
  info!(stock = product.stock_quantity, "Stock set.");
  Ok(HttpResponse::Ok().json(json!({ "product": product })))
}

#[instrument(name = "handler::admin_adjust_stock", skip_all, fields(admin_id = %admin.0.id, product_id = %path.as_ref(), delta = req_payload.delta))]
pub async fn adjust_stock_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  path: web::Path<Uuid>,
  req_payload: web::Json<AdjustStockPayload>,
) -> Result<HttpResponse, AppError> {
  let product_id = path.into_inner();
  match app_state.backend.adjust_stock(product_id, req_payload.delta).await? {
    StockChange::Applied(product) => {
      info!(stock = product.stock_quantity, "Stock adjusted.");
      Ok(HttpResponse::Ok().json(json!({ "product": product })))
    }
    StockChange::Insufficient { available } => Err(AppError::Validation(format!(
      "Adjustment would make stock negative (available: {}).",
      available
    ))),
    StockChange::NotFound => Err(AppError::NotFound(format!("Product {} not found.", product_id))),
  }
}

#[instrument(name = "handler::admin_low_stock", skip_all, fields(admin_id = %admin.0.id))]
pub async fn low_stock_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  query: web::Query<LowStockQuery>,
) -> Result<HttpResponse, AppError> {
  let threshold = query.threshold.unwrap_or(app_state.config.low_stock_threshold);
  if threshold < 0 {
    return Err(AppError::Validation("Threshold cannot be negative.".to_string()));
  }
  let products = app_state.backend.low_stock(threshold).await?;
  Ok(HttpResponse::Ok().json(json!({ "threshold": threshold, "products": products })))
}

#[instrument(name = "handler::admin_seed_catalog", skip_all, fields(admin_id = %admin.0.id))]
pub async fn seed_catalog_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  req_payload: Option<web::Json<SeedPayload>>,
) -> Result<HttpResponse, AppError> {
  let entries = match req_payload.and_then(|p| p.into_inner().products) {
    Some(entries) => entries,
    None => catalog::load_seed_file(&app_state.config.seed_catalog_path).await?,
  };
  let report = seed_catalog(app_state.backend.as_ref(), &entries).await?;
  Ok(HttpResponse::Ok().json(json!({ "report": report })))
}

// --- Discounts ---

#[instrument(name = "handler::admin_list_discounts", skip_all, fields(admin_id = %admin.0.id))]
pub async fn list_discounts_handler(app_state: web::Data<AppState>, admin: AdminUser) -> Result<HttpResponse, AppError> {
  let discounts = app_state.backend.list_discounts().await?;
  Ok(HttpResponse::Ok().json(json!({ "discounts": discounts })))
}

#[instrument(name = "handler::admin_create_discount", skip_all, fields(admin_id = %admin.0.id))]
pub async fn create_discount_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  req_payload: web::Json<DiscountInput>,
) -> Result<HttpResponse, AppError> {
  req_payload.validate().map_err(AppError::Validation)?;
  let discount = app_state.backend.insert_discount(&req_payload).await?;
  info!(code = %discount.code, "Discount created.");
  Ok(HttpResponse::Created().json(json!({ "discount": discount })))
}

#[instrument(name = "handler::admin_update_discount", skip_all, fields(admin_id = %admin.0.id, discount_id = %path.as_ref()))]
pub async fn update_discount_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  path: web::Path<Uuid>,
  req_payload: web::Json<DiscountInput>,
) -> Result<HttpResponse, AppError> {
  let discount_id = path.into_inner();
  req_payload.validate().map_err(AppError::Validation)?;
  let discount = app_state
    .backend
    .update_discount(discount_id, &req_payload)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Discount {} not found.", discount_id)))?;
  Ok(HttpResponse::Ok().json(json!({ "discount": discount })))
}

fn as_input(discount: &DiscountCode) -> DiscountInput {
  DiscountInput {
    code: discount.code.clone(),
    kind: discount.kind,
    value: discount.value,
    min_order_cents: discount.min_order_cents,
    max_uses: discount.max_uses,
    starts_at: discount.starts_at,
    expires_at: discount.expires_at,
    is_active: discount.is_active,
  }
}

#[instrument(name = "handler::admin_deactivate_discount", skip_all, fields(admin_id = %admin.0.id, discount_id = %path.as_ref()))]
pub async fn deactivate_discount_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let discount_id = path.into_inner();
  let not_found = || AppError::NotFound(format!("Discount {} not found.", discount_id));
  let current = app_state
    .backend
    .list_discounts()
    .await?
    .into_iter()
    .find(|d| d.id == discount_id)
    .ok_or_else(not_found)?;
  let input = DiscountInput {
    is_active: false,
    ..as_input(&current)
  };
  let discount = app_state
    .backend
    .update_discount(discount_id, &input)
    .await?
    .ok_or_else(not_found)?;
  info!(code = %discount.code, "Discount deactivated.");
  Ok(HttpResponse::Ok().json(json!({ "discount": discount })))
}

// --- Invoices ---

#[instrument(name = "handler::admin_list_invoices", skip_all, fields(admin_id = %admin.0.id))]
pub async fn list_invoices_handler(app_state: web::Data<AppState>, admin: AdminUser) -> Result<HttpResponse, AppError> {
  let invoices = app_state.backend.list_invoices().await?;
  Ok(HttpResponse::Ok().json(json!({ "invoices": invoices })))
}

#[instrument(name = "handler::admin_get_invoice", skip_all, fields(admin_id = %admin.0.id, invoice_id = %path.as_ref()))]
pub async fn get_invoice_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let invoice_id = path.into_inner();
  let invoice = app_state
    .backend
    .get_invoice(invoice_id)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Invoice {} not found.", invoice_id)))?;
  Ok(HttpResponse::Ok().json(json!({ "invoice": invoice })))
}

async fn change_invoice_status(
  app_state: &AppState,
  invoice_id: Uuid,
  target: InvoiceStatus,
) -> Result<HttpResponse, AppError> {
  let not_found = || AppError::NotFound(format!("Invoice {} not found.", invoice_id));
  let invoice = app_state.backend.get_invoice(invoice_id).await?.ok_or_else(not_found)?;
  let allowed = match target {
    InvoiceStatus::Paid => invoice.status == InvoiceStatus::Issued,
    InvoiceStatus::Void => invoice.status != InvoiceStatus::Void,
    InvoiceStatus::Issued => false,
  };
  if !allowed {
    return Err(AppError::Validation(format!(
      "Invoice {} cannot move from {:?} to {:?}.",
      invoice.number, invoice.status, target
    )));
  }
  let invoice = app_state
    .backend
    .set_invoice_status(invoice_id, target)
    .await?
    .ok_or_else(not_found)?;
  info!(invoice = %invoice.number, status = ?invoice.status, "Invoice status changed.");
  Ok(HttpResponse::Ok().json(json!({ "invoice": invoice })))
}

#[instrument(name = "handler::admin_pay_invoice", skip_all, fields(admin_id = %admin.0.id, invoice_id = %path.as_ref()))]
pub async fn pay_invoice_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  change_invoice_status(&app_state, path.into_inner(), InvoiceStatus::Paid).await
}

#[instrument(name = "handler::admin_void_invoice", skip_all, fields(admin_id = %admin.0.id, invoice_id = %path.as_ref()))]
pub async fn void_invoice_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  change_invoice_status(&app_state, path.into_inner(), InvoiceStatus::Void).await
}

// --- Users ---

#[instrument(name = "handler::admin_list_users", skip_all, fields(admin_id = %admin.0.id))]
pub async fn list_users_handler(app_state: web::Data<AppState>, admin: AdminUser) -> Result<HttpResponse, AppError> {
  let users = app_state.backend.list_users().await?;
  Ok(HttpResponse::Ok().json(json!({ "users": users })))
}

#[instrument(name = "handler::admin_set_user_role", skip_all, fields(admin_id = %admin.0.id, user_id = %path.as_ref(), role = ?req_payload.role))]
pub async fn set_user_role_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  path: web::Path<Uuid>,
  req_payload: web::Json<RolePayload>,
) -> Result<HttpResponse, AppError> {
  let user_id = path.into_inner();
  if user_id == admin.0.id && req_payload.role != UserRole::Admin {
    return Err(AppError::Validation("Admins cannot remove their own admin role.".to_string()));
  }
  let user = app_state
    .backend
    .set_user_role(user_id, req_payload.role)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("User {} not found.", user_id)))?;
  info!("User role changed.");
  Ok(HttpResponse::Ok().json(json!({ "user": user })))
}

// --- Payment methods ---

#[instrument(name = "handler::admin_list_payment_methods", skip_all, fields(admin_id = %admin.0.id))]
pub async fn list_payment_methods_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
) -> Result<HttpResponse, AppError> {
  let methods = app_state.backend.list_payment_methods(true).await?;
  Ok(HttpResponse::Ok().json(json!({ "paymentMethods": methods })))
}

#[instrument(name = "handler::admin_create_payment_method", skip_all, fields(admin_id = %admin.0.id, code = %req_payload.code))]
pub async fn create_payment_method_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  req_payload: web::Json<PaymentMethodInput>,
) -> Result<HttpResponse, AppError> {
  req_payload.validate().map_err(AppError::Validation)?;
  let method = app_state.backend.insert_payment_method(&req_payload).await?;
  Ok(HttpResponse::Created().json(json!({ "paymentMethod": method })))
}

#[instrument(name = "handler::admin_update_payment_method", skip_all, fields(admin_id = %admin.0.id, method_id = %path.as_ref()))]
pub async fn update_payment_method_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  path: web::Path<Uuid>,
  req_payload: web::Json<PaymentMethodInput>,
) -> Result<HttpResponse, AppError> {
  let method_id = path.into_inner();
  req_payload.validate().map_err(AppError::Validation)?;
  let method = app_state
    .backend
    .update_payment_method(method_id, &req_payload)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Payment method {} not found.", method_id)))?;
  Ok(HttpResponse::Ok().json(json!({ "paymentMethod": method })))
}

// --- Orders ---

#[instrument(name = "handler::admin_list_orders", skip_all, fields(admin_id = %admin.0.id))]
pub async fn list_orders_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  query: web::Query<OrderListQuery>,
) -> Result<HttpResponse, AppError> {
  let orders = app_state.backend.list_orders(query.status).await?;
  Ok(HttpResponse::Ok().json(json!({ "orders": orders })))
}

#[instrument(
  name = "handler::admin_change_order_status",
  skip_all,
  fields(admin_id = %admin.0.id, order_id = %path.as_ref(), status = %req_payload.status)
)]
pub async fn change_order_status_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  path: web::Path<Uuid>,
  req_payload: web::Json<OrderStatusPayload>,
) -> Result<HttpResponse, AppError> {
  let order_id = path.into_inner();
  let payload = req_payload.into_inner();
  let mut initial = OrderStatusCtxData::new(app_state.get_ref().clone(), order_id, payload.status);
  initial.tracking_number = payload.tracking_number.filter(|t| !t.trim().is_empty());
  initial.payment_reference = payload.payment_reference.filter(|r| !r.trim().is_empty());
  let ctx_data = ContextData::new(initial);

  match app_state.flows.run(ctx_data.clone()).await {
    Ok(PipelineResult::Completed) => {
      let guard = ctx_data.read();
      let order = guard.order.as_ref().ok_or_else(|| {
        warn!("Order status pipeline completed without an order.");
        AppError::Internal("Status change completed, but the order is unavailable.".to_string())
      })?;
      Ok(HttpResponse::Ok().json(json!({
        "order": order,
        "previousStatus": guard.previous_status,
        "invoice": guard.invoice,
        "restockedUnits": guard.restocked_units,
        "customerNotified": guard.customer_notified,
      })))
    }
    Ok(PipelineResult::Stopped) => {
      warn!("Order status pipeline was stopped by a handler.");
      Err(AppError::PipelineHaltedByHandler)
    }
    Err(e) => Err(e),
  }
}
