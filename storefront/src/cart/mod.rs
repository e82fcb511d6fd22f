// storefront/src/cart/mod.rs

//! Local carts, their reconciliation with the saved cart, and read views.

pub mod merge;
pub mod session;
pub mod view;

pub use merge::merge_carts;
pub use session::{CartSession, CartSessions};
pub use view::{build_cart_view, CartView, CartViewLine};
