// storefront/src/web/handlers/tool_handlers.rs

use actix_web::{web, HttpRequest, HttpResponse};
use tracing::{instrument, warn};

use crate::errors::AppError;
use crate::services::inventory_tool;
use crate::state::AppState;
use crate::web::extractors::API_KEY_HEADER;

fn check_api_key(req: &HttpRequest, app_state: &AppState) -> Result<(), AppError> {
  let expected = app_state
    .config
    .inventory_tool_api_key
    .as_deref()
    .ok_or_else(|| AppError::Forbidden("The inventory tool is disabled.".to_string()))?;
  let supplied = req.headers().get(API_KEY_HEADER).and_then(|v| v.to_str().ok());
  if supplied != Some(expected) {
    warn!("Inventory tool call with a missing or wrong API key.");
    return Err(AppError::Auth("Invalid API key.".to_string()));
  }
  Ok(())
}

/// JSON-RPC 2.0 entry point. Protocol errors are answered with HTTP 200 and a JSON-RPC error body.
#[instrument(name = "handler::inventory_tool", skip_all)]
pub async fn inventory_tool_handler(
  req: HttpRequest,
  app_state: web::Data<AppState>,
  body: web::Bytes,
) -> Result<HttpResponse, AppError> {
  check_api_key(&req, &app_state)?;

  let response = match serde_json::from_slice::<serde_json::Value>(&body) {
    Ok(raw) => app_state.inventory_tool.handle_value(raw).await,
    Err(e) => {
      warn!(error = %e, "Inventory tool received malformed JSON.");
      inventory_tool::parse_error()
    }
  };
  Ok(HttpResponse::Ok().json(response))
}
