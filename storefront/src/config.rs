// storefront/src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
  Postgres,
  Memory,
}

impl FromStr for StorageBackend {
  type Err = AppError;

  fn from_str(s: &str) -> Result<Self> {
    match s.trim().to_ascii_lowercase().as_str() {
      "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
      "memory" => Ok(StorageBackend::Memory),
      other => Err(AppError::Config(format!(
        "Invalid STORAGE_BACKEND '{}': expected 'postgres' or 'memory'",
        other
      ))),
    }
  }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  pub storage_backend: StorageBackend,
  pub database_url: Option<String>,
  pub database_max_connections: u32,

  pub cart_sync_debounce: Duration,
  /// Cart sessions untouched for this long are dropped from memory.
  pub cart_idle_ttl: Duration,
  pub session_ttl: chrono::Duration,
  pub currency: String,
  pub low_stock_threshold: i32,

  pub mail_sender: String,
  pub payment_gateway_account_id: String,
  pub inventory_tool_api_key: Option<String>,

  pub appointments_enabled: bool,
  pub seed_db: bool,
  pub seed_catalog_path: String,
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok();
    Self::from_lookup(|name| env::var(name).ok())
  }

  /// Builds the configuration from an arbitrary variable source.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let get_or = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

    let server_host = get_or("SERVER_HOST", "127.0.0.1");
    let server_port = parse_var("SERVER_PORT", &get_or("SERVER_PORT", "8080"))?;
    let storage_backend: StorageBackend = get_or("STORAGE_BACKEND", "postgres").parse()?;
    let database_url = lookup("DATABASE_URL").filter(|v| !v.trim().is_empty());
    if storage_backend == StorageBackend::Postgres && database_url.is_none() {
      return Err(AppError::Config(
        "Missing environment variable 'DATABASE_URL' (required for the postgres backend)".to_string(),
      ));
    }
    let database_max_connections = parse_var("DATABASE_MAX_CONNECTIONS", &get_or("DATABASE_MAX_CONNECTIONS", "10"))?;

    let debounce_ms: u64 = parse_var("CART_SYNC_DEBOUNCE_MS", &get_or("CART_SYNC_DEBOUNCE_MS", "800"))?;
    let cart_idle_minutes: u64 = parse_var("CART_IDLE_TTL_MINUTES", &get_or("CART_IDLE_TTL_MINUTES", "120"))?;
    if cart_idle_minutes == 0 {
      return Err(AppError::Config("CART_IDLE_TTL_MINUTES must be positive".to_string()));
    }
    let session_ttl_hours: i64 = parse_var("SESSION_TTL_HOURS", &get_or("SESSION_TTL_HOURS", "168"))?;
    if session_ttl_hours <= 0 {
      return Err(AppError::Config("SESSION_TTL_HOURS must be positive".to_string()));
    }
    let currency = get_or("CURRENCY", "USD").to_ascii_uppercase();
    if currency.len() != 3 {
      return Err(AppError::Config(format!("Invalid CURRENCY '{}'", currency)));
    }
    let low_stock_threshold: i32 = parse_var("LOW_STOCK_THRESHOLD", &get_or("LOW_STOCK_THRESHOLD", "5"))?;

    let mail_sender = get_or("MAIL_SENDER", "noreply@example.com");
    let payment_gateway_account_id = get_or("PAYMENT_GATEWAY_ACCOUNT_ID", "mock_main_acct");
    let inventory_tool_api_key = lookup("INVENTORY_TOOL_API_KEY").filter(|v| !v.trim().is_empty());

    let appointments_enabled = parse_var("APPOINTMENTS_ENABLED", &get_or("APPOINTMENTS_ENABLED", "true"))?;
    let seed_db = parse_var("SEED_DB", &get_or("SEED_DB", "false"))?;
    let seed_catalog_path = get_or("SEED_CATALOG_PATH", "seed/catalog.json");

    tracing::info!(
      backend = ?storage_backend,
      debounce_ms,
      appointments_enabled,
      "Application configuration loaded successfully."
    );

    Ok(Self {
      server_host,
      server_port,
      storage_backend,
      database_url,
      database_max_connections,
      cart_sync_debounce: Duration::from_millis(debounce_ms),
      cart_idle_ttl: Duration::from_secs(cart_idle_minutes.saturating_mul(60)),
      session_ttl: chrono::Duration::hours(session_ttl_hours),
      currency,
      low_stock_threshold,
      mail_sender,
      payment_gateway_account_id,
      inventory_tool_api_key,
      appointments_enabled,
      seed_db,
      seed_catalog_path,
    })
  }

  /// Settings for the in-memory backend, used by tests and local demos.
  pub fn for_memory_backend() -> Self {
    Self {
      server_host: "127.0.0.1".to_string(),
      server_port: 8080,
      storage_backend: StorageBackend::Memory,
      database_url: None,
      database_max_connections: 1,
      cart_sync_debounce: Duration::from_millis(800),
      cart_idle_ttl: Duration::from_secs(120 * 60),
      session_ttl: chrono::Duration::hours(168),
      currency: "USD".to_string(),
      low_stock_threshold: 5,
      mail_sender: "noreply@example.com".to_string(),
      payment_gateway_account_id: "mock_main_acct".to_string(),
      inventory_tool_api_key: None,
      appointments_enabled: true,
      seed_db: false,
      seed_catalog_path: "seed/catalog.json".to_string(),
    }
  }
}

fn parse_var<T>(name: &str, raw: &str) -> Result<T>
where
  T: FromStr,
  T::Err: std::fmt::Display,
{
  raw
    .trim()
    .parse::<T>()
    .map_err(|e| AppError::Config(format!("Invalid {} value '{}': {}", name, raw, e)))
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;

  fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    move |name| map.get(name).cloned()
  }

  #[test]
  fn defaults_apply_for_memory_backend() {
    let cfg = AppConfig::from_lookup(lookup_from(&[("STORAGE_BACKEND", "memory")])).unwrap();
    assert_eq!(cfg.server_port, 8080);
    assert_eq!(cfg.cart_sync_debounce, Duration::from_millis(800));
    assert_eq!(cfg.cart_idle_ttl, Duration::from_secs(2 * 60 * 60));
    assert_eq!(cfg.currency, "USD");
    assert!(cfg.appointments_enabled);
    assert!(cfg.inventory_tool_api_key.is_none());
  }

  #[test]
  fn postgres_backend_requires_database_url() {
    let err = AppConfig::from_lookup(lookup_from(&[])).unwrap_err();
    assert!(matches!(err, AppError::Config(msg) if msg.contains("DATABASE_URL")));
  }

  #[test]
  fn invalid_numbers_are_config_errors() {
    let err = AppConfig::from_lookup(lookup_from(&[
      ("STORAGE_BACKEND", "memory"),
      ("CART_SYNC_DEBOUNCE_MS", "soon"),
    ]))
    .unwrap_err();
    assert!(matches!(err, AppError::Config(msg) if msg.contains("CART_SYNC_DEBOUNCE_MS")));
  }
}
