// storefront/src/catalog/seed.rs

use crate::errors::{AppError, Result};
use crate::models::ProductInput;
use crate::store::{Backend, CatalogStore, SeedOutcome};
use serde::Serialize;
use std::path::Path;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedReport {
  pub inserted: usize,
  pub updated: usize,
  pub skipped: Vec<String>,
}

/// Reads a JSON array of products.
pub async fn load_seed_file(path: impl AsRef<Path>) -> Result<Vec<ProductInput>> {
  let path = path.as_ref();
  let raw = tokio::fs::read_to_string(path)
    .await
    .map_err(|e| AppError::Config(format!("Cannot read seed catalog '{}': {}", path.display(), e)))?;
  serde_json::from_str(&raw)
    .map_err(|e| AppError::Config(format!("Invalid seed catalog '{}': {}", path.display(), e)))
}

/// Upserts every entry by slug. Invalid entries are skipped and reported.
#[instrument(name = "catalog::seed_catalog", skip_all, fields(entries = entries.len()), err(Display))]
pub async fn seed_catalog(backend: &dyn Backend, entries: &[ProductInput]) -> Result<SeedReport> {
  let mut report = SeedReport::default();
  for entry in entries {
    if let Err(reason) = entry.validate() {
      warn!(slug = %entry.slug, %reason, "Skipping invalid seed entry.");
      report.skipped.push(entry.slug.clone());
      continue;
    }
    match backend.upsert_product_by_slug(entry).await? {
      SeedOutcome::Inserted => report.inserted += 1,
      SeedOutcome::Updated => report.updated += 1,
    }
  }
  info!(
    inserted = report.inserted,
    updated = report.updated,
    skipped = report.skipped.len(),
    "Catalog seeded."
  );
  Ok(report)
}
