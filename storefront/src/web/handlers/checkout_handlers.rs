// storefront/src/web/handlers/checkout_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use shopflow::{ContextData, PipelineResult};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::pipelines::contexts::{CheckoutCtxData, ShippingDetails};
use crate::state::AppState;
use crate::web::extractors::{AuthenticatedUser, CartSessionId};

#[derive(Deserialize, Debug)]
pub struct CheckoutRequestPayload {
  pub shipping: ShippingDetails,
  pub payment_method_id: Uuid,
  pub discount_code: Option<String>,
}

#[instrument(
  name = "handler::checkout",
  skip(app_state, auth_user, req_payload),
  fields(user_id = %auth_user.id(), cart_session = %cart_session.0)
)]
pub async fn checkout_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  cart_session: CartSessionId,
  req_payload: web::Json<CheckoutRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  let session = app_state
    .carts
    .get(cart_session.0)
    .ok_or_else(|| AppError::Validation("Your cart is empty.".to_string()))?;
  let ctx_data = ContextData::new(CheckoutCtxData::new(
    app_state.get_ref().clone(),
    auth_user.user,
    session,
    payload.shipping,
    payload.payment_method_id,
    payload.discount_code,
  ));

  match app_state.flows.run(ctx_data.clone()).await {
    Ok(PipelineResult::Completed) => {
      let guard = ctx_data.read();
      let order = guard.order.as_ref().ok_or_else(|| {
        warn!("Checkout pipeline completed without an order.");
        AppError::Internal("Checkout completed, but the order is unavailable.".to_string())
      })?;
      info!(
        order_id = %order.id,
        status = %order.status,
        total_cents = order.total_cents,
        confirmation_sent = guard.confirmation_sent,
        "Checkout completed."
      );
      Ok(HttpResponse::Created().json(json!({
        "message": "Order placed.",
        "order": order,
        "items": guard.order_items,
        "invoice": guard.invoice,
        "paymentReference": guard.payment_intent.as_ref().map(|i| i.id.clone()),
        "confirmationEmailSent": guard.confirmation_sent,
      })))
    }
    Ok(PipelineResult::Stopped) => {
      let guard = ctx_data.read();
      match &guard.payment_failure {
        Some(reason) => {
          warn!(order_id = ?guard.order.as_ref().map(|o| o.id), %reason, "Checkout stopped on payment failure.");
          Err(AppError::Payment(reason.clone()))
        }
        None => {
          warn!("Checkout pipeline was stopped by a handler.");
          Err(AppError::PipelineHaltedByHandler)
        }
      }
    }
    Err(app_err) => {
      warn!(error = %app_err, "Checkout failed.");
      Err(app_err)
    }
  }
}
