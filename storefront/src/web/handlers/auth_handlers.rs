// storefront/src/web/handlers/auth_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use shopflow::{ContextData, PipelineResult};
use tracing::{info, instrument, warn};

use crate::cart::build_cart_view;
use crate::errors::AppError;
use crate::pipelines::contexts::{SigninCtxData, SignupCtxData};
use crate::state::AppState;
use crate::web::extractors::{AuthenticatedUser, MaybeCartSessionId};

#[derive(Deserialize, Debug)]
pub struct SignupRequestPayload {
  pub email: String,
  pub password: String,
  pub full_name: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct SigninRequestPayload {
  pub email: String,
  pub password: String,
}

#[instrument(name = "handler::signup", skip(app_state, req_payload), fields(req_email = %req_payload.email))]
pub async fn signup_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<SignupRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  let ctx_data = ContextData::new(SignupCtxData::new(
    app_state.get_ref().clone(),
    payload.email,
    payload.password,
    payload.full_name,
  ));

  match app_state.flows.run(ctx_data.clone()).await {
    Ok(PipelineResult::Completed) => {
      let guard = ctx_data.read();
      let user = guard.created_user.as_ref().ok_or_else(|| {
        warn!("Signup pipeline completed without a created user.");
        AppError::Internal("Signup completed without creating a user.".to_string())
      })?;
      info!(user_id = %user.id, welcome_email_sent = guard.welcome_email_sent, "Signup successful.");
      Ok(HttpResponse::Created().json(json!({
        "message": "User created successfully.",
        "user": user,
        "welcomeEmailSent": guard.welcome_email_sent,
      })))
    }
    Ok(PipelineResult::Stopped) => {
      warn!("Signup pipeline was stopped by a handler.");
      Err(AppError::PipelineHaltedByHandler)
    }
    Err(e) => Err(e),
  }
}

#[instrument(name = "handler::signin", skip(app_state, req_payload, cart_session), fields(req_email = %req_payload.email))]
pub async fn signin_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<SigninRequestPayload>,
  cart_session: MaybeCartSessionId,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  let ctx_data = ContextData::new(SigninCtxData::new(
    app_state.get_ref().clone(),
    payload.email,
    payload.password,
    cart_session.0,
  ));

  match app_state.flows.run(ctx_data.clone()).await {
    Ok(PipelineResult::Completed) => {
      let (user, token, cart) = {
        let guard = ctx_data.read();
        (guard.user.clone(), guard.session_token.clone(), guard.cart.clone())
      };
      let (user, token) = user.zip(token).ok_or_else(|| {
        warn!("Signin pipeline completed without a user or token.");
        AppError::Internal("Sign-in completed without issuing a session.".to_string())
      })?;
      let cart_view = match cart {
        Some(lines) => Some(build_cart_view(app_state.backend.as_ref(), &lines, &app_state.config.currency).await?),
        None => None,
      };
      info!(user_id = %user.id, "Signin successful.");
      Ok(HttpResponse::Ok().json(json!({
        "token": token,
        "user": user,
        "cart": cart_view,
      })))
    }
    Ok(PipelineResult::Stopped) => {
      warn!("Signin pipeline was stopped by a handler.");
      Err(AppError::PipelineHaltedByHandler)
    }
    Err(e) => Err(e),
  }
}

/// Revokes the token and detaches the cart session from the user. The local cart is kept.
#[instrument(name = "handler::signout", skip(app_state, auth_user, cart_session), fields(user_id = %auth_user.id()))]
pub async fn signout_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  cart_session: MaybeCartSessionId,
) -> Result<HttpResponse, AppError> {
  let revoked = app_state.sessions.revoke(&auth_user.token);
  let bound_cart = revoked.and_then(|s| s.cart_session_id);
  for id in [bound_cart, cart_session.0].into_iter().flatten() {
    if let Some(session) = app_state.carts.get(id) {
      if session.user_id() == Some(auth_user.id()) {
        session.sign_out();
      }
    }
  }
  info!("Signed out.");
  Ok(HttpResponse::Ok().json(json!({ "message": "Signed out." })))
}

#[instrument(name = "handler::me", skip(auth_user), fields(user_id = %auth_user.id()))]
pub async fn me_handler(auth_user: AuthenticatedUser) -> Result<HttpResponse, AppError> {
  Ok(HttpResponse::Ok().json(json!({ "user": auth_user.user })))
}
