// storefront/src/models/cart_item.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One product in a cart. A cart never holds two lines for the same product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
  pub product_id: Uuid,
  pub quantity: i32,
}

/// Server-side snapshot of a signed-in user's cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedCart {
  pub user_id: Uuid,
  pub items: Vec<CartLine>,
  pub updated_at: DateTime<Utc>,
}
