// storefront/src/web/handlers/order_handlers.rs

use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::UserRole;
use crate::state::AppState;
use crate::store::{InvoiceStore, OrderStore};
use crate::web::extractors::AuthenticatedUser;

#[instrument(name = "handler::list_my_orders", skip(app_state, auth_user), fields(user_id = %auth_user.id()))]
pub async fn list_my_orders_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let orders = app_state.backend.list_orders_for_user(auth_user.id()).await?;
  Ok(HttpResponse::Ok().json(json!({ "orders": orders })))
}

/// One order with its items and invoice. Customers only see their own orders; admins see any.
#[instrument(name = "handler::get_order", skip(app_state, auth_user, path), fields(user_id = %auth_user.id(), order_id = %path.as_ref()))]
pub async fn get_order_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let order_id = path.into_inner();
  let not_found = || AppError::NotFound(format!("Order {} not found.", order_id));

  let order = app_state.backend.get_order(order_id).await?.ok_or_else(not_found)?;
  if order.user_id != auth_user.id() && auth_user.user.role != UserRole::Admin {
    warn!("Order requested by a user who does not own it.");
    return Err(not_found());
  }
  let items = app_state.backend.order_items(order_id).await?;
  let invoice = app_state.backend.invoice_for_order(order_id).await?;
  Ok(HttpResponse::Ok().json(json!({
    "order": order,
    "items": items,
    "invoice": invoice,
  })))
}
