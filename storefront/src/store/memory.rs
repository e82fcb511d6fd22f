// storefront/src/store/memory.rs

//! In-process backend with the same observable behaviour as the Postgres one.

use super::{
  AppointmentStore, BookingOutcome, CatalogStore, DiscountStore, InvoiceStore, NewOrder, OrderStatusUpdate,
  OrderStore, PaymentMethodStore, SavedCartStore, SeedOutcome, SlotQuery, StatusChange, StockChange, UserStore,
};
use crate::errors::{AppError, Result};
use crate::models::discount::normalize_code;
use crate::models::invoice::invoice_number;
use crate::models::{
  Appointment, AppointmentSlot, AppointmentStatus, CartLine, DiscountCode, DiscountInput, Invoice, InvoiceStatus,
  Order, OrderItem, OrderStatus, PaymentMethod, PaymentMethodInput, Product, ProductInput, SavedCart, User, UserRole,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use uuid::Uuid;

#[derive(Default)]
struct Tables {
  products: HashMap<Uuid, Product>,
  saved_carts: HashMap<Uuid, SavedCart>,
  users: HashMap<Uuid, User>,
  payment_methods: HashMap<Uuid, PaymentMethod>,
  discounts: HashMap<Uuid, DiscountCode>,
  orders: HashMap<Uuid, Order>,
  order_items: Vec<OrderItem>,
  invoices: HashMap<Uuid, Invoice>,
  invoice_seq: i64,
  slots: HashMap<Uuid, AppointmentSlot>,
  appointments: HashMap<Uuid, Appointment>,
}

#[derive(Default)]
pub struct MemoryBackend {
  tables: Mutex<Tables>,
  saved_cart_writes: AtomicUsize,
  fail_saved_cart_writes: AtomicBool,
  fail_invoice_writes: AtomicBool,
  fail_order_status_writes: AtomicBool,
}

impl MemoryBackend {
  pub fn new() -> Self {
    Self::default()
  }

  /// Number of saved-cart upserts received so far.
  pub fn saved_cart_writes(&self) -> usize {
    self.saved_cart_writes.load(Ordering::SeqCst)
  }

  /// Makes subsequent saved-cart upserts fail, simulating an unreachable database.
  pub fn set_fail_saved_cart_writes(&self, fail: bool) {
    self.fail_saved_cart_writes.store(fail, Ordering::SeqCst);
  }

  /// Makes subsequent invoice creation fail.
  pub fn set_fail_invoice_writes(&self, fail: bool) {
    self.fail_invoice_writes.store(fail, Ordering::SeqCst);
  }

  /// Makes subsequent order status changes fail.
  pub fn set_fail_order_status_writes(&self, fail: bool) {
    self.fail_order_status_writes.store(fail, Ordering::SeqCst);
  }
}

fn newest_first<T>(items: &mut [T], created_at: impl Fn(&T) -> DateTime<Utc>) {
  items.sort_by(|a, b| created_at(b).cmp(&created_at(a)));
}

#[async_trait]
impl CatalogStore for MemoryBackend {
  async fn list_products(&self, include_inactive: bool) -> Result<Vec<Product>> {
    let tables = self.tables.lock();
    let mut products: Vec<Product> = tables
      .products
      .values()
      .filter(|p| include_inactive || p.is_active)
      .cloned()
      .collect();
    products.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(products)
  }

  async fn get_product(&self, id: Uuid) -> Result<Option<Product>> {
    Ok(self.tables.lock().products.get(&id).cloned())
  }

  async fn get_products(&self, ids: &[Uuid]) -> Result<Vec<Product>> {
    let tables = self.tables.lock();
    Ok(ids.iter().filter_map(|id| tables.products.get(id).cloned()).collect())
  }

  async fn insert_product(&self, input: &ProductInput) -> Result<Product> {
    let mut tables = self.tables.lock();
    if tables.products.values().any(|p| p.slug == input.slug) {
      return Err(AppError::Conflict("Product slug already exists.".to_string()));
    }
    let now = Utc::now();
    let product = Product {
      id: Uuid::new_v4(),
      slug: input.slug.clone(),
      name: input.name.clone(),
      description: input.description.clone(),
      category: input.category.clone(),
      price_cents: input.price_cents,
      stock_quantity: input.stock_quantity,
      image_url: input.image_url.clone(),
      is_active: input.is_active,
      created_at: now,
      updated_at: now,
    };
    tables.products.insert(product.id, product.clone());
    Ok(product)
  }

  async fn update_product(&self, id: Uuid, input: &ProductInput) -> Result<Option<Product>> {
    let mut tables = self.tables.lock();
    if tables.products.values().any(|p| p.slug == input.slug && p.id != id) {
      return Err(AppError::Conflict("Product slug already exists.".to_string()));
    }
    Ok(tables.products.get_mut(&id).map(|p| {
      p.slug = input.slug.clone();
      p.name = input.name.clone();
      p.description = input.description.clone();
      p.category = input.category.clone();
      p.price_cents = input.price_cents;
      p.stock_quantity = input.stock_quantity;
      p.image_url = input.image_url.clone();
      p.is_active = input.is_active;
      p.updated_at = Utc::now();
      p.clone()
    }))
  }

  async fn set_product_active(&self, id: Uuid, active: bool) -> Result<Option<Product>> {
    Ok(self.tables.lock().products.get_mut(&id).map(|p| {
      p.is_active = active;
      p.updated_at = Utc::now();
      p.clone()
    }))
  }

  async fn upsert_product_by_slug(&self, input: &ProductInput) -> Result<SeedOutcome> {
    {
      let mut tables = self.tables.lock();
      if let Some(existing) = tables.products.values_mut().find(|p| p.slug == input.slug) {
        existing.name = input.name.clone();
        existing.description = input.description.clone();
        existing.category = input.category.clone();
        existing.price_cents = input.price_cents;
        existing.image_url = input.image_url.clone();
        existing.updated_at = Utc::now();
        return Ok(SeedOutcome::Updated);
      }
    }
    self.insert_product(input).await?;
    Ok(SeedOutcome::Inserted)
  }

  async fn set_stock(&self, id: Uuid, quantity: i32) -> Result<Option<Product>> {
    Ok(self.tables.lock().products.get_mut(&id).map(|p| {
      p.stock_quantity = quantity;
      p.updated_at = Utc::now();
      p.clone()
    }))
  }

  async fn adjust_stock(&self, id: Uuid, delta: i32) -> Result<StockChange> {
    let mut tables = self.tables.lock();
    let Some(product) = tables.products.get_mut(&id) else {
      return Ok(StockChange::NotFound);
    };
    let next = i64::from(product.stock_quantity) + i64::from(delta);
    if next < 0 || next > i64::from(i32::MAX) {
      return Ok(StockChange::Insufficient {
        available: product.stock_quantity,
      });
    }
    product.stock_quantity = next as i32;
    product.updated_at = Utc::now();
    Ok(StockChange::Applied(product.clone()))
  }

  async fn low_stock(&self, threshold: i32) -> Result<Vec<Product>> {
    let tables = self.tables.lock();
    let mut products: Vec<Product> = tables
      .products
      .values()
      .filter(|p| p.is_active && p.stock_quantity <= threshold)
      .cloned()
      .collect();
    products.sort_by(|a, b| a.stock_quantity.cmp(&b.stock_quantity).then_with(|| a.name.cmp(&b.name)));
    Ok(products)
  }
}

#[async_trait]
impl SavedCartStore for MemoryBackend {
  async fn load_saved_cart(&self, user_id: Uuid) -> Result<Option<SavedCart>> {
    Ok(self.tables.lock().saved_carts.get(&user_id).cloned())
  }

  async fn upsert_saved_cart(&self, user_id: Uuid, items: &[CartLine]) -> Result<()> {
    self.saved_cart_writes.fetch_add(1, Ordering::SeqCst);
    if self.fail_saved_cart_writes.load(Ordering::SeqCst) {
      return Err(AppError::Internal("saved cart store unavailable".to_string()));
    }
    self.tables.lock().saved_carts.insert(
      user_id,
      SavedCart {
        user_id,
        items: items.to_vec(),
        updated_at: Utc::now(),
      },
    );
    Ok(())
  }
}

#[async_trait]
impl UserStore for MemoryBackend {
  async fn create_user(
    &self,
    email: &str,
    password_hash: &str,
    full_name: Option<&str>,
    role: UserRole,
  ) -> Result<User> {
    let mut tables = self.tables.lock();
    if tables.users.values().any(|u| u.email == email) {
      return Err(AppError::Conflict("An account with this email already exists.".to_string()));
    }
    let now = Utc::now();
    let user = User {
      id: Uuid::new_v4(),
      email: email.to_string(),
      password_hash: password_hash.to_string(),
      full_name: full_name.map(str::to_string),
      role,
      created_at: now,
      updated_at: now,
    };
    tables.users.insert(user.id, user.clone());
    Ok(user)
  }

  async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
    Ok(self.tables.lock().users.values().find(|u| u.email == email).cloned())
  }

  async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
    Ok(self.tables.lock().users.get(&id).cloned())
  }

  async fn list_users(&self) -> Result<Vec<User>> {
    let mut users: Vec<User> = self.tables.lock().users.values().cloned().collect();
    users.sort_by(|a, b| a.email.cmp(&b.email));
    Ok(users)
  }

  async fn set_user_role(&self, id: Uuid, role: UserRole) -> Result<Option<User>> {
    Ok(self.tables.lock().users.get_mut(&id).map(|u| {
      u.role = role;
      u.updated_at = Utc::now();
      u.clone()
    }))
  }
}

#[async_trait]
impl PaymentMethodStore for MemoryBackend {
  async fn list_payment_methods(&self, include_inactive: bool) -> Result<Vec<PaymentMethod>> {
    let mut methods: Vec<PaymentMethod> = self
      .tables
      .lock()
      .payment_methods
      .values()
      .filter(|m| include_inactive || m.is_active)
      .cloned()
      .collect();
    methods.sort_by(|a, b| a.sort_order.cmp(&b.sort_order).then_with(|| a.name.cmp(&b.name)));
    Ok(methods)
  }

  async fn get_payment_method(&self, id: Uuid) -> Result<Option<PaymentMethod>> {
    Ok(self.tables.lock().payment_methods.get(&id).cloned())
  }

  async fn insert_payment_method(&self, input: &PaymentMethodInput) -> Result<PaymentMethod> {
    let mut tables = self.tables.lock();
    if tables.payment_methods.values().any(|m| m.code == input.code) {
      return Err(AppError::Conflict("Payment method code already exists.".to_string()));
    }
    let method = PaymentMethod {
      id: Uuid::new_v4(),
      code: input.code.clone(),
      name: input.name.clone(),
      kind: input.kind,
      instructions: input.instructions.clone(),
      is_active: input.is_active,
      sort_order: input.sort_order,
    };
    tables.payment_methods.insert(method.id, method.clone());
    Ok(method)
  }

  async fn update_payment_method(&self, id: Uuid, input: &PaymentMethodInput) -> Result<Option<PaymentMethod>> {
    Ok(self.tables.lock().payment_methods.get_mut(&id).map(|m| {
      m.code = input.code.clone();
      m.name = input.name.clone();
      m.kind = input.kind;
      m.instructions = input.instructions.clone();
      m.is_active = input.is_active;
      m.sort_order = input.sort_order;
      m.clone()
    }))
  }
}

#[async_trait]
impl DiscountStore for MemoryBackend {
  async fn list_discounts(&self) -> Result<Vec<DiscountCode>> {
    let mut discounts: Vec<DiscountCode> = self.tables.lock().discounts.values().cloned().collect();
    newest_first(&mut discounts, |d| d.created_at);
    Ok(discounts)
  }

  async fn find_discount_by_code(&self, code: &str) -> Result<Option<DiscountCode>> {
    let code = normalize_code(code);
    Ok(self.tables.lock().discounts.values().find(|d| d.code == code).cloned())
  }

  async fn insert_discount(&self, input: &DiscountInput) -> Result<DiscountCode> {
    let code = normalize_code(&input.code);
    let mut tables = self.tables.lock();
    if tables.discounts.values().any(|d| d.code == code) {
      return Err(AppError::Conflict("Discount code already exists.".to_string()));
    }
    let discount = DiscountCode {
      id: Uuid::new_v4(),
      code,
      kind: input.kind,
      value: input.value,
      min_order_cents: input.min_order_cents,
      max_uses: input.max_uses,
      used_count: 0,
      starts_at: input.starts_at,
      expires_at: input.expires_at,
      is_active: input.is_active,
      created_at: Utc::now(),
    };
    tables.discounts.insert(discount.id, discount.clone());
    Ok(discount)
  }

  async fn update_discount(&self, id: Uuid, input: &DiscountInput) -> Result<Option<DiscountCode>> {
    Ok(self.tables.lock().discounts.get_mut(&id).map(|d| {
      d.code = normalize_code(&input.code);
      d.kind = input.kind;
      d.value = input.value;
      d.min_order_cents = input.min_order_cents;
      d.max_uses = input.max_uses;
      d.starts_at = input.starts_at;
      d.expires_at = input.expires_at;
      d.is_active = input.is_active;
      d.clone()
    }))
  }

  async fn redeem_discount(&self, id: Uuid) -> Result<bool> {
    let mut tables = self.tables.lock();
    match tables.discounts.get_mut(&id) {
      Some(d) if d.max_uses.map_or(true, |max| d.used_count < max) => {
        d.used_count += 1;
        Ok(true)
      }
      _ => Ok(false),
    }
  }
}

#[async_trait]
impl OrderStore for MemoryBackend {
  async fn create_order(&self, new_order: &NewOrder) -> Result<(Order, Vec<OrderItem>)> {
    let now = Utc::now();
    let order = Order {
      id: new_order.id,
      user_id: new_order.user_id,
      status: OrderStatus::Pending,
      subtotal_cents: new_order.subtotal_cents,
      discount_cents: new_order.discount_cents,
      total_cents: new_order.total_cents,
      currency: new_order.currency.clone(),
      discount_code: new_order.discount_code.clone(),
      payment_method_id: new_order.payment_method_id,
      shipping_name: new_order.shipping_name.clone(),
      shipping_email: new_order.shipping_email.clone(),
      shipping_address: new_order.shipping_address.clone(),
      tracking_number: None,
      payment_reference: None,
      created_at: now,
      updated_at: now,
    };
    let items: Vec<OrderItem> = new_order
      .items
      .iter()
      .map(|item| OrderItem {
        id: Uuid::new_v4(),
        order_id: order.id,
        product_id: item.product_id,
        product_name: item.product_name.clone(),
        quantity: item.quantity,
        unit_price_cents: item.unit_price_cents,
      })
      .collect();
    let mut tables = self.tables.lock();
    if tables.orders.contains_key(&order.id) {
      return Err(AppError::Conflict("Order already exists.".to_string()));
    }
    tables.orders.insert(order.id, order.clone());
    tables.order_items.extend(items.iter().cloned());
    Ok((order, items))
  }

  async fn get_order(&self, id: Uuid) -> Result<Option<Order>> {
    Ok(self.tables.lock().orders.get(&id).cloned())
  }

  async fn order_items(&self, order_id: Uuid) -> Result<Vec<OrderItem>> {
    Ok(
      self
        .tables
        .lock()
        .order_items
        .iter()
        .filter(|i| i.order_id == order_id)
        .cloned()
        .collect(),
    )
  }

  async fn list_orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>> {
    let mut orders: Vec<Order> = self
      .tables
      .lock()
      .orders
      .values()
      .filter(|o| o.user_id == user_id)
      .cloned()
      .collect();
    newest_first(&mut orders, |o| o.created_at);
    Ok(orders)
  }

  async fn list_orders(&self, status: Option<OrderStatus>) -> Result<Vec<Order>> {
    let mut orders: Vec<Order> = self
      .tables
      .lock()
      .orders
      .values()
      .filter(|o| status.map_or(true, |s| o.status == s))
      .cloned()
      .collect();
    newest_first(&mut orders, |o| o.created_at);
    Ok(orders)
  }

  async fn update_order_status(
    &self,
    id: Uuid,
    from: OrderStatus,
    to: OrderStatus,
    update: &OrderStatusUpdate,
  ) -> Result<StatusChange> {
    if self.fail_order_status_writes.load(Ordering::SeqCst) {
      return Err(AppError::Internal("order store unavailable".to_string()));
    }
    let mut tables = self.tables.lock();
    let Some(o) = tables.orders.get_mut(&id) else {
      return Ok(StatusChange::NotFound);
    };
    if o.status != from {
      return Ok(StatusChange::Stale { current: o.status });
    }
    o.status = to;
    if update.tracking_number.is_some() {
      o.tracking_number = update.tracking_number.clone();
    }
    if update.payment_reference.is_some() {
      o.payment_reference = update.payment_reference.clone();
    }
    o.updated_at = Utc::now();
    Ok(StatusChange::Applied(o.clone()))
  }
}

#[async_trait]
impl InvoiceStore for MemoryBackend {
  async fn create_invoice(&self, order: &Order, status: InvoiceStatus) -> Result<Invoice> {
    if self.fail_invoice_writes.load(Ordering::SeqCst) {
      return Err(AppError::Internal("invoice store unavailable".to_string()));
    }
    let mut tables = self.tables.lock();
    if tables.invoices.values().any(|i| i.order_id == order.id) {
      return Err(AppError::Conflict("Order already has an invoice.".to_string()));
    }
    tables.invoice_seq += 1;
    let now = Utc::now();
    let invoice = Invoice {
      id: Uuid::new_v4(),
      order_id: order.id,
      number: invoice_number(now, tables.invoice_seq),
      status,
      total_cents: order.total_cents,
      currency: order.currency.clone(),
      issued_at: now,
      paid_at: (status == InvoiceStatus::Paid).then_some(now),
    };
    tables.invoices.insert(invoice.id, invoice.clone());
    Ok(invoice)
  }

  async fn get_invoice(&self, id: Uuid) -> Result<Option<Invoice>> {
    Ok(self.tables.lock().invoices.get(&id).cloned())
  }

  async fn invoice_for_order(&self, order_id: Uuid) -> Result<Option<Invoice>> {
    Ok(self.tables.lock().invoices.values().find(|i| i.order_id == order_id).cloned())
  }

  async fn list_invoices(&self) -> Result<Vec<Invoice>> {
    let mut invoices: Vec<Invoice> = self.tables.lock().invoices.values().cloned().collect();
    newest_first(&mut invoices, |i| i.issued_at);
    Ok(invoices)
  }

  async fn set_invoice_status(&self, id: Uuid, status: InvoiceStatus) -> Result<Option<Invoice>> {
    Ok(self.tables.lock().invoices.get_mut(&id).map(|i| {
      i.status = status;
      if status == InvoiceStatus::Paid && i.paid_at.is_none() {
        i.paid_at = Some(Utc::now());
      }
      i.clone()
    }))
  }
}

#[async_trait]
impl AppointmentStore for MemoryBackend {
  async fn list_slots(&self, query: &SlotQuery) -> Result<Vec<AppointmentSlot>> {
    let mut slots: Vec<AppointmentSlot> = self
      .tables
      .lock()
      .slots
      .values()
      .filter(|s| query.nutritionist_id.map_or(true, |n| s.nutritionist_id == n))
      .filter(|s| query.from.map_or(true, |from| s.starts_at >= from))
      .filter(|s| query.to.map_or(true, |to| s.starts_at < to))
      .filter(|s| !query.only_available || !s.is_booked)
      .cloned()
      .collect();
    slots.sort_by_key(|s| s.starts_at);
    Ok(slots)
  }

  async fn insert_slots(
    &self,
    nutritionist_id: Uuid,
    windows: &[(DateTime<Utc>, DateTime<Utc>)],
  ) -> Result<Vec<AppointmentSlot>> {
    let mut tables = self.tables.lock();
    let created: Vec<AppointmentSlot> = windows
      .iter()
      .map(|(starts_at, ends_at)| AppointmentSlot {
        id: Uuid::new_v4(),
        nutritionist_id,
        starts_at: *starts_at,
        ends_at: *ends_at,
        is_booked: false,
      })
      .collect();
    for slot in &created {
      tables.slots.insert(slot.id, slot.clone());
    }
    Ok(created)
  }

  async fn book_slot(&self, slot_id: Uuid, customer_id: Uuid, notes: Option<&str>) -> Result<BookingOutcome> {
    let mut tables = self.tables.lock();
    let Some(slot) = tables.slots.get_mut(&slot_id) else {
      return Ok(BookingOutcome::SlotNotFound);
    };
    if slot.is_booked {
      return Ok(BookingOutcome::SlotTaken);
    }
    slot.is_booked = true;
    let appointment = Appointment {
      id: Uuid::new_v4(),
      slot_id,
      customer_id,
      nutritionist_id: slot.nutritionist_id,
      starts_at: slot.starts_at,
      notes: notes.map(str::to_string),
      status: AppointmentStatus::Booked,
      created_at: Utc::now(),
    };
    tables.appointments.insert(appointment.id, appointment.clone());
    Ok(BookingOutcome::Booked(appointment))
  }

  async fn get_appointment(&self, id: Uuid) -> Result<Option<Appointment>> {
    Ok(self.tables.lock().appointments.get(&id).cloned())
  }

  async fn list_appointments_for_customer(&self, customer_id: Uuid) -> Result<Vec<Appointment>> {
    let mut list: Vec<Appointment> = self
      .tables
      .lock()
      .appointments
      .values()
      .filter(|a| a.customer_id == customer_id)
      .cloned()
      .collect();
    list.sort_by_key(|a| a.starts_at);
    Ok(list)
  }

  async fn list_appointments_for_nutritionist(&self, nutritionist_id: Uuid) -> Result<Vec<Appointment>> {
    let mut list: Vec<Appointment> = self
      .tables
      .lock()
      .appointments
      .values()
      .filter(|a| a.nutritionist_id == nutritionist_id)
      .cloned()
      .collect();
    list.sort_by_key(|a| a.starts_at);
    Ok(list)
  }

  async fn cancel_appointment(&self, id: Uuid) -> Result<Option<Appointment>> {
    let mut tables = self.tables.lock();
    let Some(appointment) = tables.appointments.get_mut(&id) else {
      return Ok(None);
    };
    if appointment.status == AppointmentStatus::Booked {
      appointment.status = AppointmentStatus::Cancelled;
      let slot_id = appointment.slot_id;
      let cancelled = appointment.clone();
      if let Some(slot) = tables.slots.get_mut(&slot_id) {
        slot.is_booked = false;
      }
      return Ok(Some(cancelled));
    }
    Ok(Some(appointment.clone()))
  }
}
