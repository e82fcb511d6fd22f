// storefront/src/web/handlers/cart_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::cart::build_cart_view;
use crate::errors::AppError;
use crate::models::CartLine;
use crate::state::AppState;
use crate::web::extractors::{CartSessionId, MaybeAuthenticatedUser};

#[derive(Deserialize, Debug)]
pub struct AddItemPayload {
  pub product_id: Uuid,
  #[serde(default = "one")]
  pub quantity: i32,
}

fn one() -> i32 {
  1
}

#[derive(Deserialize, Debug)]
pub struct SetQuantityPayload {
  pub quantity: i32,
}

async fn cart_response(app_state: &AppState, lines: &[CartLine]) -> Result<HttpResponse, AppError> {
  let view = build_cart_view(app_state.backend.as_ref(), lines, &app_state.config.currency).await?;
  Ok(HttpResponse::Ok().json(json!({ "cart": view })))
}

#[instrument(name = "handler::view_cart", skip(app_state, caller), fields(cart_session = %cart_session.0))]
pub async fn view_cart_handler(
  app_state: web::Data<AppState>,
  cart_session: CartSessionId,
  caller: MaybeAuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let lines = match app_state.carts.get(cart_session.0) {
    Some(session) => {
      session.ensure_accessible_by(caller.user_id())?;
      session.lines()
    }
    None => Vec::new(),
  };
  cart_response(&app_state, &lines).await
}

#[instrument(
  name = "handler::add_cart_item",
  skip(app_state, caller, req_payload),
  fields(cart_session = %cart_session.0, product_id = %req_payload.product_id, quantity = req_payload.quantity)
)]
pub async fn add_cart_item_handler(
  app_state: web::Data<AppState>,
  cart_session: CartSessionId,
  caller: MaybeAuthenticatedUser,
  req_payload: web::Json<AddItemPayload>,
) -> Result<HttpResponse, AppError> {
  let session = app_state.carts.get_or_create(cart_session.0);
  session.ensure_accessible_by(caller.user_id())?;
  let lines = session.add_item(req_payload.product_id, req_payload.quantity).await?;
  info!(lines = lines.len(), "Item added to cart.");
  cart_response(&app_state, &lines).await
}

#[instrument(
  name = "handler::set_cart_item",
  skip(app_state, caller, path, req_payload),
  fields(cart_session = %cart_session.0)
)]
pub async fn set_cart_item_handler(
  app_state: web::Data<AppState>,
  cart_session: CartSessionId,
  caller: MaybeAuthenticatedUser,
  path: web::Path<Uuid>,
  req_payload: web::Json<SetQuantityPayload>,
) -> Result<HttpResponse, AppError> {
  let session = app_state.carts.get_or_create(cart_session.0);
  session.ensure_accessible_by(caller.user_id())?;
  let lines = session.set_quantity(path.into_inner(), req_payload.quantity).await?;
  cart_response(&app_state, &lines).await
}

#[instrument(name = "handler::remove_cart_item", skip(app_state, caller, path), fields(cart_session = %cart_session.0))]
pub async fn remove_cart_item_handler(
  app_state: web::Data<AppState>,
  cart_session: CartSessionId,
  caller: MaybeAuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  // Removing from a cart that was never created leaves nothing to store.
  let Some(session) = app_state.carts.get(cart_session.0) else {
    return cart_response(&app_state, &[]).await;
  };
  session.ensure_accessible_by(caller.user_id())?;
  let lines = session.remove_item(path.into_inner());
  cart_response(&app_state, &lines).await
}

#[instrument(name = "handler::clear_cart", skip(app_state, caller), fields(cart_session = %cart_session.0))]
pub async fn clear_cart_handler(
  app_state: web::Data<AppState>,
  cart_session: CartSessionId,
  caller: MaybeAuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let Some(session) = app_state.carts.get(cart_session.0) else {
    return cart_response(&app_state, &[]).await;
  };
  session.ensure_accessible_by(caller.user_id())?;
  let lines = session.clear();
  cart_response(&app_state, &lines).await
}
