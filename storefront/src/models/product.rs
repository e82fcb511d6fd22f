// storefront/src/models/product.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Product {
  pub id: Uuid,
  pub slug: String,
  pub name: String,
  pub description: Option<String>,
  pub category: Option<String>,
  pub price_cents: i64,
  pub stock_quantity: i32,
  pub image_url: Option<String>,
  pub is_active: bool,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Product {
  pub fn is_purchasable(&self, quantity: i32) -> bool {
    self.is_active && self.stock_quantity >= quantity
  }
}

/// Fields accepted when creating or fully updating a product.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductInput {
  pub slug: String,
  pub name: String,
  pub description: Option<String>,
  pub category: Option<String>,
  pub price_cents: i64,
  #[serde(default)]
  pub stock_quantity: i32,
  pub image_url: Option<String>,
  #[serde(default = "default_active")]
  pub is_active: bool,
}

fn default_active() -> bool {
  true
}

impl ProductInput {
  pub fn validate(&self) -> Result<(), String> {
    let slug_ok = !self.slug.is_empty()
      && self
        .slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if !slug_ok {
      return Err("Slug is required and may only contain lowercase letters, digits and '-'.".to_string());
    }
    if self.name.trim().is_empty() {
      return Err("Product name is required.".to_string());
    }
    if self.price_cents < 0 {
      return Err("Price cannot be negative.".to_string());
    }
    if self.stock_quantity < 0 {
      return Err("Stock cannot be negative.".to_string());
    }
    Ok(())
  }
}
