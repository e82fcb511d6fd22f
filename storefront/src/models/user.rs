// storefront/src/models/user.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "user_role_enum", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
  Customer,
  Admin,
  Nutritionist,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
  pub id: Uuid,
  pub email: String,
  #[serde(skip_serializing)]
  pub password_hash: String,
  pub full_name: Option<String>,
  pub role: UserRole,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl User {
  pub fn display_name(&self) -> String {
    match &self.full_name {
      Some(name) if !name.trim().is_empty() => name.clone(),
      _ => self.email.split('@').next().unwrap_or("Customer").to_string(),
    }
  }
}
