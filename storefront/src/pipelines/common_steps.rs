// storefront/src/pipelines/common_steps.rs

//! Helpers shared by several pipelines.

use crate::store::{Backend, CatalogStore, StockChange};
use tracing::{info, warn};
use uuid::Uuid;

/// Gives `units` back to each product. Best effort: failures are logged and skipped.
///
/// Returns the number of units actually restored.
pub async fn release_stock(backend: &dyn Backend, units: &[(Uuid, i32)]) -> i32 {
  let mut restored = 0;
  for (product_id, quantity) in units {
    match backend.adjust_stock(*product_id, *quantity).await {
      Ok(StockChange::Applied(_)) => restored += quantity,
      Ok(other) => warn!(%product_id, quantity, outcome = ?other, "Stock release was not applied."),
      Err(e) => warn!(%product_id, quantity, error = %e, "Stock release failed."),
    }
  }
  if restored > 0 {
    info!(units = restored, "Stock released.");
  }
  restored
}
