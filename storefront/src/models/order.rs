// storefront/src/models/order.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "order_status_enum", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
  Pending,
  Paid,
  Processing,
  Shipped,
  Delivered,
  Cancelled,
}

impl OrderStatus {
  pub fn can_transition_to(self, next: OrderStatus) -> bool {
    use OrderStatus::*;
    matches!(
      (self, next),
      (Pending, Paid)
        | (Pending, Cancelled)
        | (Paid, Processing)
        | (Paid, Cancelled)
        | (Processing, Shipped)
        | (Processing, Cancelled)
        | (Shipped, Delivered)
    )
  }

  pub fn is_terminal(self) -> bool {
    matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
  }
}

impl fmt::Display for OrderStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let label = match self {
      OrderStatus::Pending => "pending",
      OrderStatus::Paid => "paid",
      OrderStatus::Processing => "processing",
      OrderStatus::Shipped => "shipped",
      OrderStatus::Delivered => "delivered",
      OrderStatus::Cancelled => "cancelled",
    };
    f.write_str(label)
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Order {
  pub id: Uuid,
  pub user_id: Uuid,
  pub status: OrderStatus,
  pub subtotal_cents: i64,
  pub discount_cents: i64,
  pub total_cents: i64,
  pub currency: String,
  pub discount_code: Option<String>,
  pub payment_method_id: Uuid,
  pub shipping_name: String,
  pub shipping_email: String,
  pub shipping_address: String,
  pub tracking_number: Option<String>,
  pub payment_reference: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
  use super::OrderStatus::*;

  #[test]
  fn forward_transitions_are_allowed() {
    assert!(Pending.can_transition_to(Paid));
    assert!(Paid.can_transition_to(Processing));
    assert!(Processing.can_transition_to(Shipped));
    assert!(Shipped.can_transition_to(Delivered));
  }

  #[test]
  fn skipping_or_reopening_is_rejected() {
    assert!(!Pending.can_transition_to(Shipped));
    assert!(!Shipped.can_transition_to(Cancelled));
    assert!(!Delivered.can_transition_to(Pending));
    assert!(!Cancelled.can_transition_to(Paid));
    assert!(!Paid.can_transition_to(Paid));
  }

  #[test]
  fn terminal_states() {
    assert!(Delivered.is_terminal());
    assert!(Cancelled.is_terminal());
    assert!(!Shipped.is_terminal());
  }
}
