// storefront/src/web/handlers/product_handlers.rs

use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::catalog::ProductFilter;
use crate::errors::AppError;
use crate::state::AppState;
use crate::store::{CatalogStore, PaymentMethodStore};

#[instrument(name = "handler::list_products", skip(app_state, filter))]
pub async fn list_products_handler(
  app_state: web::Data<AppState>,
  filter: web::Query<ProductFilter>,
) -> Result<HttpResponse, AppError> {
  let filter = filter.into_inner();
  filter.validate().map_err(AppError::Validation)?;

  let products = filter.apply(app_state.backend.list_products(false).await?);
  info!(count = products.len(), "Products listed.");
  Ok(HttpResponse::Ok().json(json!({ "products": products })))
}

#[instrument(name = "handler::get_product", skip(app_state, path), fields(product_id = %path.as_ref()))]
pub async fn get_product_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let product_id = path.into_inner();
  let product = app_state
    .backend
    .get_product(product_id)
    .await?
    .filter(|p| p.is_active)
    .ok_or_else(|| AppError::NotFound(format!("Product with ID {} not found.", product_id)))?;
  Ok(HttpResponse::Ok().json(json!({ "product": product })))
}

#[instrument(name = "handler::list_payment_methods", skip(app_state))]
pub async fn list_payment_methods_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let methods = app_state.backend.list_payment_methods(false).await?;
  Ok(HttpResponse::Ok().json(json!({ "paymentMethods": methods })))
}
