// storefront/src/models/payment_method.rs

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "payment_kind_enum", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentKind {
  /// Charged online through the payment gateway during checkout.
  Card,
  BankTransfer,
  CashOnDelivery,
}

impl PaymentKind {
  pub fn is_online(self) -> bool {
    matches!(self, PaymentKind::Card)
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct PaymentMethod {
  pub id: Uuid,
  pub code: String,
  pub name: String,
  pub kind: PaymentKind,
  pub instructions: Option<String>,
  pub is_active: bool,
  pub sort_order: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentMethodInput {
  pub code: String,
  pub name: String,
  pub kind: PaymentKind,
  pub instructions: Option<String>,
  #[serde(default = "default_active")]
  pub is_active: bool,
  #[serde(default)]
  pub sort_order: i32,
}

fn default_active() -> bool {
  true
}

impl PaymentMethodInput {
  pub fn validate(&self) -> Result<(), String> {
    if self.code.trim().is_empty() || self.name.trim().is_empty() {
      return Err("Payment method code and name are required.".to_string());
    }
    Ok(())
  }
}
