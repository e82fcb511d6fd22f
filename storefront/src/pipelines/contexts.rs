// storefront/src/pipelines/contexts.rs

//! Data carried through each pipeline. Handlers receive it wrapped in `shopflow::ContextData`.

use crate::cart::CartSession;
use crate::models::{
  CartLine, DiscountCode, Invoice, Order, OrderItem, OrderStatus, PaymentMethod, User,
};
use crate::pricing::{PricedLine, Quote};
use crate::services::payment_gateway::PaymentIntent;
use crate::state::AppState;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct SignupCtxData {
  pub app_state: AppState,
  pub email: String,
  pub password: String,
  pub full_name: Option<String>,
  pub password_hash: Option<String>,
  pub created_user: Option<User>,
  pub welcome_email_sent: bool,
}

impl SignupCtxData {
  pub fn new(app_state: AppState, email: String, password: String, full_name: Option<String>) -> Self {
    Self {
      app_state,
      email,
      password,
      full_name,
      password_hash: None,
      created_user: None,
      welcome_email_sent: false,
    }
  }
}

#[derive(Clone)]
pub struct SigninCtxData {
  pub app_state: AppState,
  pub email: String,
  pub password: String,
  pub cart_session_id: Option<Uuid>,
  pub user: Option<User>,
  pub session_token: Option<String>,
  /// Cart after reconciliation, when a cart session was supplied.
  pub cart: Option<Vec<CartLine>>,
}

impl SigninCtxData {
  pub fn new(app_state: AppState, email: String, password: String, cart_session_id: Option<Uuid>) -> Self {
    Self {
      app_state,
      email,
      password,
      cart_session_id,
      user: None,
      session_token: None,
      cart: None,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShippingDetails {
  pub name: String,
  pub email: String,
  pub address: String,
}

#[derive(Clone)]
pub struct CheckoutCtxData {
  pub app_state: AppState,
  pub user: User,
  pub cart_session: Arc<CartSession>,
  pub shipping: ShippingDetails,
  pub payment_method_id: Uuid,
  pub discount_code: Option<String>,

  pub lines: Vec<CartLine>,
  pub payment_method: Option<PaymentMethod>,
  pub discount: Option<DiscountCode>,
  pub priced_lines: Vec<PricedLine>,
  pub quote: Option<Quote>,
  /// Stock taken so far, as (product id, quantity); given back on failure.
  pub reserved: Vec<(Uuid, i32)>,
  pub order: Option<Order>,
  pub order_items: Vec<OrderItem>,
  pub payment_intent: Option<PaymentIntent>,
  pub payment_failure: Option<String>,
  pub invoice: Option<Invoice>,
  pub confirmation_sent: bool,
}

impl CheckoutCtxData {
  pub fn new(
    app_state: AppState,
    user: User,
    cart_session: Arc<CartSession>,
    shipping: ShippingDetails,
    payment_method_id: Uuid,
    discount_code: Option<String>,
  ) -> Self {
    Self {
      app_state,
      user,
      cart_session,
      shipping,
      payment_method_id,
      discount_code,
      lines: Vec::new(),
      payment_method: None,
      discount: None,
      priced_lines: Vec::new(),
      quote: None,
      reserved: Vec::new(),
      order: None,
      order_items: Vec::new(),
      payment_intent: None,
      payment_failure: None,
      invoice: None,
      confirmation_sent: false,
    }
  }

  pub fn pays_by_card(&self) -> bool {
    self.payment_method.as_ref().is_some_and(|m| m.kind.is_online())
  }
}

#[derive(Clone)]
pub struct OrderStatusCtxData {
  pub app_state: AppState,
  pub order_id: Uuid,
  pub new_status: OrderStatus,
  pub tracking_number: Option<String>,
  pub payment_reference: Option<String>,

  pub previous_status: Option<OrderStatus>,
  pub order: Option<Order>,
  pub invoice: Option<Invoice>,
  pub restocked_units: i32,
  pub customer_notified: bool,
}

impl std::fmt::Debug for OrderStatusCtxData {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("OrderStatusCtxData")
      .field("order_id", &self.order_id)
      .field("new_status", &self.new_status)
      .field("tracking_number", &self.tracking_number)
      .field("payment_reference", &self.payment_reference)
      .field("previous_status", &self.previous_status)
      .field("order", &self.order)
      .field("invoice", &self.invoice)
      .field("restocked_units", &self.restocked_units)
      .field("customer_notified", &self.customer_notified)
      .finish_non_exhaustive()
  }
}

impl OrderStatusCtxData {
  pub fn new(app_state: AppState, order_id: Uuid, new_status: OrderStatus) -> Self {
    Self {
      app_state,
      order_id,
      new_status,
      tracking_number: None,
      payment_reference: None,
      previous_status: None,
      order: None,
      invoice: None,
      restocked_units: 0,
      customer_notified: false,
    }
  }
}
