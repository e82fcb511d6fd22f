// storefront/src/pipelines/signin_pipeline.rs

use crate::errors::AppError;
use crate::pipelines::contexts::SigninCtxData;
use crate::services::auth_service;
use crate::store::UserStore;
use shopflow::{ContextData, FlowRegistry, Pipeline, StepControl, StepDef};
use tracing::{event, warn, Level};

const INVALID_CREDENTIALS: &str = "Invalid email or password.";

pub fn build_signin_pipeline() -> Pipeline<SigninCtxData, AppError> {
  let mut p = Pipeline::<SigninCtxData, AppError>::new(
    "signin",
    [
      StepDef::required("validate_signin_input"),
      StepDef::required("fetch_user_by_email"),
      StepDef::required("verify_user_password"),
      StepDef::required("issue_session_token"),
      StepDef::required("reconcile_saved_cart").skip_if(|data: &SigninCtxData| data.cart_session_id.is_none()),
    ],
  );

  p.on_step("validate_signin_input", |ctx_data: ContextData<SigninCtxData>| async move {
    let (email, password_empty) = {
      let guard = ctx_data.read();
      (guard.email.clone(), guard.password.is_empty())
    };
    let email = auth_service::normalize_email(&email)?;
    if password_empty {
      return Err(AppError::Validation("Password is required.".to_string()));
    }
    ctx_data.write().email = email;
    Ok::<_, AppError>(StepControl::Continue)
  });

  p.on_step("fetch_user_by_email", |ctx_data: ContextData<SigninCtxData>| async move {
    let (backend, email) = {
      let guard = ctx_data.read();
      (guard.app_state.backend.clone(), guard.email.clone())
    };
    match backend.find_user_by_email(&email).await? {
      Some(user) => {
        event!(Level::DEBUG, user_id = %user.id, "User found for signin.");
        ctx_data.write().user = Some(user);
        Ok::<_, AppError>(StepControl::Continue)
      }
      None => {
        warn!(%email, "Signin for unknown email.");
        Err(AppError::Auth(INVALID_CREDENTIALS.to_string()))
      }
    }
  });

  p.on_step("verify_user_password", |ctx_data: ContextData<SigninCtxData>| async move {
    let (stored_hash, password, user_id) = {
      let guard = ctx_data.read();
      let user = guard
        .user
        .as_ref()
        .ok_or_else(|| AppError::Internal("User missing before password check.".to_string()))?;
      (user.password_hash.clone(), guard.password.clone(), user.id)
    };
    let matches = auth_service::verify_password(&stored_hash, &password)?;
    ctx_data.write().password.clear();
    if !matches {
      warn!(%user_id, "Password mismatch on signin.");
      return Err(AppError::Auth(INVALID_CREDENTIALS.to_string()));
    }
    Ok::<_, AppError>(StepControl::Continue)
  });

  p.on_step("issue_session_token", |ctx_data: ContextData<SigninCtxData>| async move {
    let mut guard = ctx_data.write();
    let user_id = guard
      .user
      .as_ref()
      .map(|u| u.id)
      .ok_or_else(|| AppError::Internal("User missing at token issue.".to_string()))?;
    let (token, _) = guard.app_state.sessions.issue(user_id, guard.cart_session_id);
    guard.session_token = Some(token);
    event!(Level::INFO, %user_id, "Session token issued.");
    Ok::<_, AppError>(StepControl::Continue)
  });

  p.on_step("reconcile_saved_cart", |ctx_data: ContextData<SigninCtxData>| async move {
    let (carts, cart_session_id, user_id) = {
      let guard = ctx_data.read();
      (
        guard.app_state.carts.clone(),
        guard.cart_session_id,
        guard.user.as_ref().map(|u| u.id),
      )
    };
    if let (Some(cart_session_id), Some(user_id)) = (cart_session_id, user_id) {
      let session = carts.get_or_create(cart_session_id);
      let lines = session.sign_in(user_id).await;
      ctx_data.write().cart = Some(lines);
    }
    Ok::<_, AppError>(StepControl::Continue)
  });

  p
}

pub fn register_signin_pipeline(flows: &FlowRegistry<AppError>) {
  flows.register(build_signin_pipeline());
  tracing::info!("Signin pipeline registered.");
}
