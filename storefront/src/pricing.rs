// storefront/src/pricing.rs

//! Order totals and discount rules.

use crate::errors::AppError;
use crate::models::{DiscountCode, DiscountKind};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedLine {
  pub product_id: Uuid,
  pub product_name: String,
  pub quantity: i32,
  pub unit_price_cents: i64,
}

impl PricedLine {
  /// `None` when the total does not fit in an `i64`.
  pub fn line_total_cents(&self) -> Option<i64> {
    self.unit_price_cents.checked_mul(i64::from(self.quantity))
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
  pub subtotal_cents: i64,
  pub discount_cents: i64,
  pub total_cents: i64,
}

/// Amount a discount takes off `subtotal_cents` at `now`, or the reason it does not apply.
pub fn discount_amount(discount: &DiscountCode, subtotal_cents: i64, now: DateTime<Utc>) -> Result<i64, String> {
  if !discount.is_active {
    return Err(format!("Discount code '{}' is not active.", discount.code));
  }
  if discount.starts_at.is_some_and(|start| now < start) {
    return Err(format!("Discount code '{}' is not valid yet.", discount.code));
  }
  if discount.expires_at.is_some_and(|end| now >= end) {
    return Err(format!("Discount code '{}' has expired.", discount.code));
  }
  if discount.max_uses.is_some_and(|max| discount.used_count >= max) {
    return Err(format!("Discount code '{}' has been used up.", discount.code));
  }
  if let Some(min) = discount.min_order_cents {
    if subtotal_cents < min {
      return Err(format!(
        "Discount code '{}' requires an order of at least {} cents.",
        discount.code, min
      ));
    }
  }

  let amount = match discount.kind {
    DiscountKind::Percent => {
      let off = i128::from(subtotal_cents) * i128::from(discount.value.clamp(0, 100)) / 100;
      i64::try_from(off).unwrap_or(subtotal_cents)
    }
    DiscountKind::Fixed => discount.value.max(0),
  };
  Ok(amount.min(subtotal_cents))
}

/// Totals `lines` and applies `discount` if given. An inapplicable discount is a validation error.
pub fn quote(lines: &[PricedLine], discount: Option<&DiscountCode>, now: DateTime<Utc>) -> Result<Quote, AppError> {
  let subtotal_cents = lines
    .iter()
    .try_fold(0i64, |acc, line| line.line_total_cents().and_then(|t| acc.checked_add(t)))
    .ok_or_else(|| AppError::Validation("Order total is too large.".to_string()))?;
  let discount_cents = match discount {
    Some(d) => discount_amount(d, subtotal_cents, now).map_err(AppError::Validation)?,
    None => 0,
  };
  Ok(Quote {
    subtotal_cents,
    discount_cents,
    total_cents: subtotal_cents - discount_cents,
  })
}
