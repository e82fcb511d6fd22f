// storefront/src/models/invoice.rs

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "invoice_status_enum", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
  Issued,
  Paid,
  Void,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Invoice {
  pub id: Uuid,
  pub order_id: Uuid,
  pub number: String,
  pub status: InvoiceStatus,
  pub total_cents: i64,
  pub currency: String,
  pub issued_at: DateTime<Utc>,
  pub paid_at: Option<DateTime<Utc>>,
}

/// `INV-<year>-<sequence padded to six digits>`.
pub fn invoice_number(issued_at: DateTime<Utc>, sequence: i64) -> String {
  format!("INV-{}-{:06}", issued_at.year(), sequence)
}
