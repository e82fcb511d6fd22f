// storefront/src/catalog/filter.rs

use crate::models::Product;
use serde::Deserialize;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
  #[default]
  Name,
  PriceAsc,
  PriceDesc,
  Newest,
}

impl FromStr for ProductSort {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "name" => Ok(ProductSort::Name),
      "price_asc" => Ok(ProductSort::PriceAsc),
      "price_desc" => Ok(ProductSort::PriceDesc),
      "newest" => Ok(ProductSort::Newest),
      other => Err(format!("Unknown sort '{}'.", other)),
    }
  }
}

/// Query-string filter for the public product list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductFilter {
  pub search: Option<String>,
  pub category: Option<String>,
  pub in_stock: Option<bool>,
  pub min_price_cents: Option<i64>,
  pub max_price_cents: Option<i64>,
  #[serde(default)]
  pub sort: ProductSort,
}

impl ProductFilter {
  pub fn validate(&self) -> Result<(), String> {
    if let (Some(min), Some(max)) = (self.min_price_cents, self.max_price_cents) {
      if min > max {
        return Err("min_price_cents cannot exceed max_price_cents.".to_string());
      }
    }
    Ok(())
  }

  pub fn matches(&self, product: &Product) -> bool {
    if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
      let needle = search.to_lowercase();
      let in_name = product.name.to_lowercase().contains(&needle);
      let in_description = product
        .description
        .as_deref()
        .is_some_and(|d| d.to_lowercase().contains(&needle));
      if !in_name && !in_description {
        return false;
      }
    }
    if let Some(category) = self.category.as_deref().filter(|c| !c.is_empty()) {
      if !product.category.as_deref().is_some_and(|c| c.eq_ignore_ascii_case(category)) {
        return false;
      }
    }
    if self.in_stock == Some(true) && product.stock_quantity <= 0 {
      return false;
    }
    if self.min_price_cents.is_some_and(|min| product.price_cents < min) {
      return false;
    }
    if self.max_price_cents.is_some_and(|max| product.price_cents > max) {
      return false;
    }
    true
  }

  /// Filters and sorts `products` in place of a database query.
  pub fn apply(&self, products: Vec<Product>) -> Vec<Product> {
    let mut kept: Vec<Product> = products.into_iter().filter(|p| self.matches(p)).collect();
    match self.sort {
      ProductSort::Name => kept.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase())),
      ProductSort::PriceAsc => kept.sort_by(|a, b| a.price_cents.cmp(&b.price_cents).then_with(|| a.name.cmp(&b.name))),
      ProductSort::PriceDesc => kept.sort_by(|a, b| b.price_cents.cmp(&a.price_cents).then_with(|| a.name.cmp(&b.name))),
      ProductSort::Newest => kept.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
    }
    kept
  }
}
