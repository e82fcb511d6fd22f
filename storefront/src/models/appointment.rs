// storefront/src/models/appointment.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct AppointmentSlot {
  pub id: Uuid,
  pub nutritionist_id: Uuid,
  pub starts_at: DateTime<Utc>,
  pub ends_at: DateTime<Utc>,
  pub is_booked: bool,
}

impl AppointmentSlot {
  pub fn overlaps(&self, starts_at: DateTime<Utc>, ends_at: DateTime<Utc>) -> bool {
    self.starts_at < ends_at && starts_at < self.ends_at
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "appointment_status_enum", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
  Booked,
  Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Appointment {
  pub id: Uuid,
  pub slot_id: Uuid,
  pub customer_id: Uuid,
  pub nutritionist_id: Uuid,
  pub starts_at: DateTime<Utc>,
  pub notes: Option<String>,
  pub status: AppointmentStatus,
  pub created_at: DateTime<Utc>,
}
