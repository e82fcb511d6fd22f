// storefront/src/models/discount.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "discount_kind_enum", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DiscountKind {
  /// `value` is a percentage, 1..=100.
  Percent,
  /// `value` is an amount in cents.
  Fixed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct DiscountCode {
  pub id: Uuid,
  pub code: String,
  pub kind: DiscountKind,
  pub value: i64,
  pub min_order_cents: Option<i64>,
  pub max_uses: Option<i32>,
  pub used_count: i32,
  pub starts_at: Option<DateTime<Utc>>,
  pub expires_at: Option<DateTime<Utc>>,
  pub is_active: bool,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscountInput {
  pub code: String,
  pub kind: DiscountKind,
  pub value: i64,
  pub min_order_cents: Option<i64>,
  pub max_uses: Option<i32>,
  pub starts_at: Option<DateTime<Utc>>,
  pub expires_at: Option<DateTime<Utc>>,
  #[serde(default = "default_active")]
  pub is_active: bool,
}

fn default_active() -> bool {
  true
}

/// Codes are matched case-insensitively and stored upper-cased.
pub fn normalize_code(code: &str) -> String {
  code.trim().to_ascii_uppercase()
}

impl DiscountInput {
  pub fn validate(&self) -> Result<(), String> {
    if normalize_code(&self.code).is_empty() {
      return Err("Discount code is required.".to_string());
    }
    match self.kind {
      DiscountKind::Percent if !(1..=100).contains(&self.value) => {
        return Err("Percent discounts must be between 1 and 100.".to_string());
      }
      DiscountKind::Fixed if self.value <= 0 => {
        return Err("Fixed discounts must be positive.".to_string());
      }
      _ => {}
    }
    if matches!(self.min_order_cents, Some(min) if min < 0) {
      return Err("Minimum order amount cannot be negative.".to_string());
    }
    if matches!(self.max_uses, Some(max) if max <= 0) {
      return Err("Maximum uses must be positive when set.".to_string());
    }
    if let (Some(start), Some(end)) = (self.starts_at, self.expires_at) {
      if start >= end {
        return Err("Discount must start before it expires.".to_string());
      }
    }
    Ok(())
  }
}
