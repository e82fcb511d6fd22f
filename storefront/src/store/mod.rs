// storefront/src/store/mod.rs

//! Storage port.
//!
//! Every read and write against the managed database goes through these
//! traits. `postgres::PgBackend` is the production implementation;
//! `memory::MemoryBackend` backs tests and local demos.

use crate::errors::Result;
use crate::models::{
  Appointment, AppointmentSlot, CartLine, DiscountCode, DiscountInput, Invoice, InvoiceStatus, Order, OrderItem,
  OrderStatus, PaymentMethod, PaymentMethodInput, Product, ProductInput, SavedCart, User, UserRole,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub mod memory;
pub mod postgres;

pub use memory::MemoryBackend;
pub use postgres::PgBackend;

/// Result of a conditional stock change.
#[derive(Debug, Clone, PartialEq)]
pub enum StockChange {
  Applied(Product),
  /// The change would have left stock below zero; nothing was written.
  Insufficient { available: i32 },
  NotFound,
}

/// Result of a compare-and-set order status change.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusChange {
  Applied(Order),
  /// The order had moved on from the expected status; nothing was written.
  Stale { current: OrderStatus },
  NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
  Inserted,
  Updated,
}

#[derive(Debug, Clone)]
pub struct NewOrderItem {
  pub product_id: Uuid,
  pub product_name: String,
  pub quantity: i32,
  pub unit_price_cents: i64,
}

#[derive(Debug, Clone)]
pub struct NewOrder {
  pub id: Uuid,
  pub user_id: Uuid,
  pub subtotal_cents: i64,
  pub discount_cents: i64,
  pub total_cents: i64,
  pub currency: String,
  pub discount_code: Option<String>,
  pub payment_method_id: Uuid,
  pub shipping_name: String,
  pub shipping_email: String,
  pub shipping_address: String,
  pub items: Vec<NewOrderItem>,
}

#[derive(Debug, Clone, Default)]
pub struct OrderStatusUpdate {
  pub tracking_number: Option<String>,
  pub payment_reference: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BookingOutcome {
  Booked(Appointment),
  SlotTaken,
  SlotNotFound,
}

#[derive(Debug, Clone, Default)]
pub struct SlotQuery {
  pub nutritionist_id: Option<Uuid>,
  pub from: Option<DateTime<Utc>>,
  pub to: Option<DateTime<Utc>>,
  pub only_available: bool,
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
  async fn list_products(&self, include_inactive: bool) -> Result<Vec<Product>>;
  async fn get_product(&self, id: Uuid) -> Result<Option<Product>>;
  async fn get_products(&self, ids: &[Uuid]) -> Result<Vec<Product>>;
  async fn insert_product(&self, input: &ProductInput) -> Result<Product>;
  async fn update_product(&self, id: Uuid, input: &ProductInput) -> Result<Option<Product>>;
  async fn set_product_active(&self, id: Uuid, active: bool) -> Result<Option<Product>>;
  /// Inserts by slug, or updates descriptive fields and price of the existing row. Stock is only set on insert.
  async fn upsert_product_by_slug(&self, input: &ProductInput) -> Result<SeedOutcome>;
  async fn set_stock(&self, id: Uuid, quantity: i32) -> Result<Option<Product>>;
  /// Adds `delta` to the stock unless the result would be negative.
  async fn adjust_stock(&self, id: Uuid, delta: i32) -> Result<StockChange>;
  async fn low_stock(&self, threshold: i32) -> Result<Vec<Product>>;
}

#[async_trait]
pub trait SavedCartStore: Send + Sync {
  async fn load_saved_cart(&self, user_id: Uuid) -> Result<Option<SavedCart>>;
  /// Overwrites the stored cart blob for `user_id`.
  async fn upsert_saved_cart(&self, user_id: Uuid, items: &[CartLine]) -> Result<()>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
  async fn create_user(
    &self,
    email: &str,
    password_hash: &str,
    full_name: Option<&str>,
    role: UserRole,
  ) -> Result<User>;
  async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;
  async fn get_user(&self, id: Uuid) -> Result<Option<User>>;
  async fn list_users(&self) -> Result<Vec<User>>;
  async fn set_user_role(&self, id: Uuid, role: UserRole) -> Result<Option<User>>;
}

#[async_trait]
pub trait PaymentMethodStore: Send + Sync {
  async fn list_payment_methods(&self, include_inactive: bool) -> Result<Vec<PaymentMethod>>;
  async fn get_payment_method(&self, id: Uuid) -> Result<Option<PaymentMethod>>;
  async fn insert_payment_method(&self, input: &PaymentMethodInput) -> Result<PaymentMethod>;
  async fn update_payment_method(&self, id: Uuid, input: &PaymentMethodInput) -> Result<Option<PaymentMethod>>;
}

#[async_trait]
pub trait DiscountStore: Send + Sync {
  async fn list_discounts(&self) -> Result<Vec<DiscountCode>>;
  async fn find_discount_by_code(&self, code: &str) -> Result<Option<DiscountCode>>;
  async fn insert_discount(&self, input: &DiscountInput) -> Result<DiscountCode>;
  async fn update_discount(&self, id: Uuid, input: &DiscountInput) -> Result<Option<DiscountCode>>;
  /// Increments `used_count` unless `max_uses` is reached. Returns whether the use was recorded.
  async fn redeem_discount(&self, id: Uuid) -> Result<bool>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
  async fn create_order(&self, order: &NewOrder) -> Result<(Order, Vec<OrderItem>)>;
  async fn get_order(&self, id: Uuid) -> Result<Option<Order>>;
  async fn order_items(&self, order_id: Uuid) -> Result<Vec<OrderItem>>;
  async fn list_orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>>;
  async fn list_orders(&self, status: Option<OrderStatus>) -> Result<Vec<Order>>;
  /// Moves the order from `from` to `to`, only if it is still in `from`.
  async fn update_order_status(
    &self,
    id: Uuid,
    from: OrderStatus,
    to: OrderStatus,
    update: &OrderStatusUpdate,
  ) -> Result<StatusChange>;
}

#[async_trait]
pub trait InvoiceStore: Send + Sync {
  /// Creates the invoice of an order, assigning the next invoice number.
  async fn create_invoice(&self, order: &Order, status: InvoiceStatus) -> Result<Invoice>;
  async fn get_invoice(&self, id: Uuid) -> Result<Option<Invoice>>;
  async fn invoice_for_order(&self, order_id: Uuid) -> Result<Option<Invoice>>;
  async fn list_invoices(&self) -> Result<Vec<Invoice>>;
  async fn set_invoice_status(&self, id: Uuid, status: InvoiceStatus) -> Result<Option<Invoice>>;
}

#[async_trait]
pub trait AppointmentStore: Send + Sync {
  async fn list_slots(&self, query: &SlotQuery) -> Result<Vec<AppointmentSlot>>;
  async fn insert_slots(
    &self,
    nutritionist_id: Uuid,
    windows: &[(DateTime<Utc>, DateTime<Utc>)],
  ) -> Result<Vec<AppointmentSlot>>;
  /// Flips the slot to booked and records the appointment, unless it is already booked.
  async fn book_slot(&self, slot_id: Uuid, customer_id: Uuid, notes: Option<&str>) -> Result<BookingOutcome>;
  async fn get_appointment(&self, id: Uuid) -> Result<Option<Appointment>>;
  async fn list_appointments_for_customer(&self, customer_id: Uuid) -> Result<Vec<Appointment>>;
  async fn list_appointments_for_nutritionist(&self, nutritionist_id: Uuid) -> Result<Vec<Appointment>>;
  /// Cancels a booked appointment and frees its slot.
  async fn cancel_appointment(&self, id: Uuid) -> Result<Option<Appointment>>;
}

/// Everything the storefront needs from its database.
pub trait Backend:
  CatalogStore
  + SavedCartStore
  + UserStore
  + PaymentMethodStore
  + DiscountStore
  + OrderStore
  + InvoiceStore
  + AppointmentStore
{
}

impl<T> Backend for T where
  T: CatalogStore
    + SavedCartStore
    + UserStore
    + PaymentMethodStore
    + DiscountStore
    + OrderStore
    + InvoiceStore
    + AppointmentStore
{
}
