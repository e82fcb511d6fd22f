// storefront/src/web/extractors.rs

//! Request extractors for bearer-token identity and the cart session header.

use actix_web::dev::Payload;
use actix_web::{web, FromRequest, HttpRequest};
use futures_util::future::{ready, LocalBoxFuture, Ready};
use tracing::warn;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{User, UserRole};
use crate::state::AppState;
use crate::store::UserStore;

pub const CART_SESSION_HEADER: &str = "X-Cart-Session";
pub const API_KEY_HEADER: &str = "X-Api-Key";

fn app_state(req: &HttpRequest) -> Result<web::Data<AppState>, AppError> {
  req
    .app_data::<web::Data<AppState>>()
    .cloned()
    .ok_or_else(|| AppError::Internal("Application state is not configured.".to_string()))
}

/// Token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(req: &HttpRequest) -> Option<String> {
  let value = req.headers().get(actix_web::http::header::AUTHORIZATION)?.to_str().ok()?;
  let token = value.strip_prefix("Bearer ")?.trim();
  (!token.is_empty()).then(|| token.to_string())
}

/// The signed-in user behind a valid bearer token.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
  pub user: User,
  pub token: String,
}

impl AuthenticatedUser {
  pub fn id(&self) -> Uuid {
    self.user.id
  }
}

impl FromRequest for AuthenticatedUser {
  type Error = AppError;
  type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    let state = app_state(req);
    let token = bearer_token(req);
    Box::pin(async move {
      let state = state?;
      let token = token.ok_or_else(|| AppError::Auth("Sign in required.".to_string()))?;
      let session = state.sessions.validate(&token).ok_or_else(|| {
        warn!("Rejected unknown or expired session token.");
        AppError::Auth("Session is invalid or has expired.".to_string())
      })?;
      let user = state
        .backend
        .get_user(session.user_id)
        .await?
        .ok_or_else(|| AppError::Auth("Session user no longer exists.".to_string()))?;
      Ok(AuthenticatedUser { user, token })
    })
  }
}

/// The signed-in user when an `Authorization` header was sent.
///
/// No header means an anonymous caller. A header with an unknown or expired
/// token is still rejected.
#[derive(Debug, Clone)]
pub struct MaybeAuthenticatedUser(pub Option<AuthenticatedUser>);

impl MaybeAuthenticatedUser {
  pub fn user_id(&self) -> Option<Uuid> {
    self.0.as_ref().map(AuthenticatedUser::id)
  }
}

impl FromRequest for MaybeAuthenticatedUser {
  type Error = AppError;
  type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
    if !req.headers().contains_key(actix_web::http::header::AUTHORIZATION) {
      return Box::pin(async { Ok(MaybeAuthenticatedUser(None)) });
    }
    let authenticated = AuthenticatedUser::from_request(req, payload);
    Box::pin(async move { Ok(MaybeAuthenticatedUser(Some(authenticated.await?))) })
  }
}

/// An authenticated user with the admin role.
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

impl FromRequest for AdminUser {
  type Error = AppError;
  type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
    let authenticated = AuthenticatedUser::from_request(req, payload);
    Box::pin(async move {
      let AuthenticatedUser { user, .. } = authenticated.await?;
      if user.role != UserRole::Admin {
        warn!(user_id = %user.id, "Non-admin attempted an admin operation.");
        return Err(AppError::Forbidden("Administrator role required.".to_string()));
      }
      Ok(AdminUser(user))
    })
  }
}

fn parse_cart_session(req: &HttpRequest) -> Result<Option<Uuid>, AppError> {
  match req.headers().get(CART_SESSION_HEADER) {
    None => Ok(None),
    Some(value) => value
      .to_str()
      .ok()
      .and_then(|raw| Uuid::parse_str(raw.trim()).ok())
      .map(Some)
      .ok_or_else(|| AppError::Validation(format!("{} must be a UUID.", CART_SESSION_HEADER))),
  }
}

/// Required `X-Cart-Session` header.
#[derive(Debug, Clone, Copy)]
pub struct CartSessionId(pub Uuid);

impl FromRequest for CartSessionId {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    ready(parse_cart_session(req).and_then(|id| {
      id.map(CartSessionId)
        .ok_or_else(|| AppError::Validation(format!("Missing {} header.", CART_SESSION_HEADER)))
    }))
  }
}

/// `X-Cart-Session` header when the client sent one. A malformed value is still rejected.
#[derive(Debug, Clone, Copy)]
pub struct MaybeCartSessionId(pub Option<Uuid>);

impl FromRequest for MaybeCartSessionId {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    ready(parse_cart_session(req).map(MaybeCartSessionId))
  }
}
