// storefront/src/cart/view.rs

use crate::errors::Result;
use crate::models::CartLine;
use crate::store::{Backend, CatalogStore};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartViewLine {
  pub product_id: Uuid,
  pub name: Option<String>,
  pub unit_price_cents: i64,
  pub quantity: i32,
  pub line_total_cents: i64,
  /// False when the product is gone, inactive, or has less stock than the line asks for.
  pub available: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
  pub lines: Vec<CartViewLine>,
  pub item_count: i32,
  pub subtotal_cents: i64,
  pub currency: String,
}

/// Resolves cart lines against the current catalog. Unavailable lines are listed but not priced.
pub async fn build_cart_view(backend: &dyn Backend, lines: &[CartLine], currency: &str) -> Result<CartView> {
  let ids: Vec<Uuid> = lines.iter().map(|l| l.product_id).collect();
  let products = backend.get_products(&ids).await?;

  let view_lines: Vec<CartViewLine> = lines
    .iter()
    .map(|line| match products.iter().find(|p| p.id == line.product_id) {
      Some(product) => {
        let available = product.is_purchasable(line.quantity);
        CartViewLine {
          product_id: line.product_id,
          name: Some(product.name.clone()),
          unit_price_cents: product.price_cents,
          quantity: line.quantity,
          line_total_cents: if available {
            product.price_cents.saturating_mul(i64::from(line.quantity))
          } else {
            0
          },
          available,
        }
      }
      None => CartViewLine {
        product_id: line.product_id,
        name: None,
        unit_price_cents: 0,
        quantity: line.quantity,
        line_total_cents: 0,
        available: false,
      },
    })
    .collect();

  Ok(CartView {
    item_count: view_lines.iter().fold(0i32, |acc, l| acc.saturating_add(l.quantity.max(0))),
    subtotal_cents: view_lines.iter().fold(0i64, |acc, l| acc.saturating_add(l.line_total_cents)),
    lines: view_lines,
    currency: currency.to_string(),
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::ProductInput;
  use crate::store::MemoryBackend;

  #[tokio::test]
  async fn large_saved_quantities_saturate() {
    let backend = MemoryBackend::new();
    let product = backend
      .insert_product(&ProductInput {
        slug: "mega-gainer".to_string(),
        name: "Mega gainer".to_string(),
        description: None,
        category: None,
        price_cents: i64::MAX / 4,
        stock_quantity: i32::MAX,
        image_url: None,
        is_active: true,
      })
      .await
      .unwrap();
    let lines = vec![
      CartLine { product_id: product.id, quantity: i32::MAX },
      CartLine { product_id: Uuid::new_v4(), quantity: i32::MAX },
    ];

    let view = build_cart_view(&backend, &lines, "USD").await.unwrap();

    assert_eq!(view.item_count, i32::MAX);
    assert_eq!(view.lines[0].line_total_cents, i64::MAX);
    assert_eq!(view.subtotal_cents, i64::MAX);
  }
}
