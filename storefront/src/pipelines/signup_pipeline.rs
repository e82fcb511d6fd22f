// storefront/src/pipelines/signup_pipeline.rs

use crate::errors::AppError;
use crate::models::UserRole;
use crate::pipelines::contexts::SignupCtxData;
use crate::services::{auth_service, mailer};
use crate::store::UserStore;
use shopflow::{ContextData, FlowRegistry, Pipeline, StepControl, StepDef};
use tracing::{event, info, Level};

pub fn build_signup_pipeline() -> Pipeline<SignupCtxData, AppError> {
  let mut p = Pipeline::<SignupCtxData, AppError>::new(
    "signup",
    [
      StepDef::required("validate_signup_input"),
      StepDef::required("hash_password"),
      StepDef::required("create_user_record"),
      StepDef::optional("send_welcome_email"),
    ],
  );

  p.on_step("validate_signup_input", |ctx_data: ContextData<SignupCtxData>| async move {
    let (email, password) = {
      let guard = ctx_data.read();
      (guard.email.clone(), guard.password.clone())
    };
    let email = auth_service::normalize_email(&email)?;
    auth_service::validate_new_password(&password)?;
    event!(Level::DEBUG, %email, "Signup input validated.");
    ctx_data.update(|data| {
      data.email = email;
      data.full_name = data
        .full_name
        .take()
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());
    });
    Ok::<_, AppError>(StepControl::Continue)
  });

  p.on_step("hash_password", |ctx_data: ContextData<SignupCtxData>| async move {
    let password = ctx_data.read().password.clone();
    let hash = auth_service::hash_password(&password)?;
    ctx_data.update(|data| {
      data.password_hash = Some(hash);
      data.password.clear();
    });
    Ok::<_, AppError>(StepControl::Continue)
  });

  p.on_step("create_user_record", |ctx_data: ContextData<SignupCtxData>| async move {
    let (backend, email, hash, full_name) = {
      let guard = ctx_data.read();
      (
        guard.app_state.backend.clone(),
        guard.email.clone(),
        guard.password_hash.clone(),
        guard.full_name.clone(),
      )
    };
    let hash = hash.ok_or_else(|| AppError::Internal("Password hash missing at user creation.".to_string()))?;
    let user = backend
      .create_user(&email, &hash, full_name.as_deref(), UserRole::Customer)
      .await?;
    info!(user_id = %user.id, "User account created.");
    ctx_data.write().created_user = Some(user);
    Ok::<_, AppError>(StepControl::Continue)
  });

  p.on_step("send_welcome_email", |ctx_data: ContextData<SignupCtxData>| async move {
    let (mail, user) = {
      let guard = ctx_data.read();
      (guard.app_state.mailer.clone(), guard.created_user.clone())
    };
    if let Some(user) = user {
      let sent = mailer::send_best_effort(mail.as_ref(), mailer::welcome_email(&user)).await;
      ctx_data.write().welcome_email_sent = sent;
    }
    Ok::<_, AppError>(StepControl::Continue)
  });

  p
}

pub fn register_signup_pipeline(flows: &FlowRegistry<AppError>) {
  flows.register(build_signup_pipeline());
  tracing::info!("Signup pipeline registered.");
}
