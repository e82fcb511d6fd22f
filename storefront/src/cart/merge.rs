// storefront/src/cart/merge.rs

use crate::models::CartLine;
use std::collections::HashSet;
use uuid::Uuid;

/// Reconciles a locally held cart with the cart saved for the user.
///
/// The saved lines come first, in their stored order, and keep their
/// quantities. Local lines for products the saved cart does not mention are
/// appended in local order. Running the merge again against the same saved
/// cart returns the same list.
pub fn merge_carts(local: &[CartLine], saved: &[CartLine]) -> Vec<CartLine> {
  let mut merged = Vec::with_capacity(saved.len() + local.len());
  let mut seen: HashSet<Uuid> = HashSet::with_capacity(saved.len() + local.len());

  for line in saved.iter().chain(local.iter()) {
    if seen.insert(line.product_id) {
      merged.push(line.clone());
    }
  }
  merged
}

#[cfg(test)]
mod tests {
  use super::*;

  fn line(product_id: Uuid, quantity: i32) -> CartLine {
    CartLine { product_id, quantity }
  }

  #[test]
  fn saved_lines_win_and_local_only_lines_are_appended() {
    let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    let local = vec![line(a, 5), line(c, 1)];
    let saved = vec![line(b, 2), line(a, 1)];

    let merged = merge_carts(&local, &saved);

    assert_eq!(merged, vec![line(b, 2), line(a, 1), line(c, 1)]);
  }

  #[test]
  fn contains_every_saved_line_and_every_missing_local_line() {
    let ids: Vec<Uuid> = (0..6).map(|_| Uuid::new_v4()).collect();
    let local = vec![line(ids[0], 1), line(ids[1], 2), line(ids[2], 3), line(ids[5], 9)];
    let saved = vec![line(ids[2], 7), line(ids[3], 1), line(ids[4], 4)];

    let merged = merge_carts(&local, &saved);

    for s in &saved {
      assert!(merged.contains(s), "saved line {:?} missing", s);
    }
    for l in local.iter().filter(|l| !saved.iter().any(|s| s.product_id == l.product_id)) {
      assert!(merged.contains(l), "local-only line {:?} missing", l);
    }
    assert_eq!(merged.len(), 6);
  }

  #[test]
  fn merging_again_with_the_same_saved_cart_is_a_no_op() {
    let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    let local = vec![line(a, 3), line(b, 1)];
    let saved = vec![line(b, 4), line(c, 2)];

    let once = merge_carts(&local, &saved);
    let twice = merge_carts(&once, &saved);

    assert_eq!(once, twice);
  }

  #[test]
  fn empty_sides() {
    let a = Uuid::new_v4();
    assert!(merge_carts(&[], &[]).is_empty());
    assert_eq!(merge_carts(&[line(a, 2)], &[]), vec![line(a, 2)]);
    assert_eq!(merge_carts(&[], &[line(a, 2)]), vec![line(a, 2)]);
  }
}
