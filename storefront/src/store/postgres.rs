// storefront/src/store/postgres.rs

//! Postgres implementation of the storage port, using runtime-checked `sqlx` queries.

use super::{
  AppointmentStore, BookingOutcome, CatalogStore, DiscountStore, InvoiceStore, NewOrder, OrderStatusUpdate,
  OrderStore, PaymentMethodStore, SavedCartStore, SeedOutcome, SlotQuery, StatusChange, StockChange,
  UserStore,
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
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::{event, instrument, Level};
use uuid::Uuid;

const PRODUCT_COLUMNS: &str =
  "id, slug, name, description, category, price_cents, stock_quantity, image_url, is_active, created_at, updated_at";
const USER_COLUMNS: &str = "id, email, password_hash, full_name, role, created_at, updated_at";
const PAYMENT_METHOD_COLUMNS: &str = "id, code, name, kind, instructions, is_active, sort_order";
const DISCOUNT_COLUMNS: &str =
  "id, code, kind, value, min_order_cents, max_uses, used_count, starts_at, expires_at, is_active, created_at";
const ORDER_COLUMNS: &str = "id, user_id, status, subtotal_cents, discount_cents, total_cents, currency, \
  discount_code, payment_method_id, shipping_name, shipping_email, shipping_address, tracking_number, \
  payment_reference, created_at, updated_at";
const ORDER_ITEM_COLUMNS: &str = "id, order_id, product_id, product_name, quantity, unit_price_cents";
const INVOICE_COLUMNS: &str = "id, order_id, number, status, total_cents, currency, issued_at, paid_at";
const SLOT_COLUMNS: &str = "id, nutritionist_id, starts_at, ends_at, is_booked";
const APPOINTMENT_COLUMNS: &str = "id, slot_id, customer_id, nutritionist_id, starts_at, notes, status, created_at";

#[derive(Clone)]
pub struct PgBackend {
  pool: PgPool,
}

impl PgBackend {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }

  /// Opens a pool against `database_url` and applies pending migrations.
  #[instrument(name = "PgBackend::connect", skip(database_url), err(Display))]
  pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
    let pool = PgPoolOptions::new()
      .max_connections(max_connections)
      .connect(database_url)
      .await?;
    event!(Level::INFO, "Connected to the database.");
    sqlx::migrate!("./migrations").run(&pool).await?;
    event!(Level::INFO, "Database migrations applied.");
    Ok(Self::new(pool))
  }

  pub fn pool(&self) -> &PgPool {
    &self.pool
  }
}

#[async_trait]
impl CatalogStore for PgBackend {
  async fn list_products(&self, include_inactive: bool) -> Result<Vec<Product>> {
    let sql = format!(
      "SELECT {} FROM products WHERE ($1 OR is_active) ORDER BY name",
      PRODUCT_COLUMNS
    );
    Ok(
      sqlx::query_as::<_, Product>(&sql)
        .bind(include_inactive)
        .fetch_all(&self.pool)
        .await?,
    )
  }

  async fn get_product(&self, id: Uuid) -> Result<Option<Product>> {
    let sql = format!("SELECT {} FROM products WHERE id = $1", PRODUCT_COLUMNS);
    Ok(sqlx::query_as::<_, Product>(&sql).bind(id).fetch_optional(&self.pool).await?)
  }

  async fn get_products(&self, ids: &[Uuid]) -> Result<Vec<Product>> {
    let sql = format!("SELECT {} FROM products WHERE id = ANY($1)", PRODUCT_COLUMNS);
    Ok(sqlx::query_as::<_, Product>(&sql).bind(ids).fetch_all(&self.pool).await?)
  }

  async fn insert_product(&self, input: &ProductInput) -> Result<Product> {
    let sql = format!(
      "INSERT INTO products (slug, name, description, category, price_cents, stock_quantity, image_url, is_active) \
       VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {}",
      PRODUCT_COLUMNS
    );
    sqlx::query_as::<_, Product>(&sql)
      .bind(&input.slug)
      .bind(&input.name)
      .bind(&input.description)
      .bind(&input.category)
      .bind(input.price_cents)
      .bind(input.stock_quantity)
      .bind(&input.image_url)
      .bind(input.is_active)
      .fetch_one(&self.pool)
      .await
      .map_err(|e| AppError::from_unique_violation(e, "Product slug"))
  }

  async fn update_product(&self, id: Uuid, input: &ProductInput) -> Result<Option<Product>> {
    let sql = format!(
      "UPDATE products SET slug = $2, name = $3, description = $4, category = $5, price_cents = $6, \
       stock_quantity = $7, image_url = $8, is_active = $9, updated_at = NOW() WHERE id = $1 RETURNING {}",
      PRODUCT_COLUMNS
    );
    sqlx::query_as::<_, Product>(&sql)
      .bind(id)
      .bind(&input.slug)
      .bind(&input.name)
      .bind(&input.description)
      .bind(&input.category)
      .bind(input.price_cents)
      .bind(input.stock_quantity)
      .bind(&input.image_url)
      .bind(input.is_active)
      .fetch_optional(&self.pool)
      .await
      .map_err(|e| AppError::from_unique_violation(e, "Product slug"))
  }

  async fn set_product_active(&self, id: Uuid, active: bool) -> Result<Option<Product>> {
    let sql = format!(
      "UPDATE products SET is_active = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
      PRODUCT_COLUMNS
    );
    Ok(
      sqlx::query_as::<_, Product>(&sql)
        .bind(id)
        .bind(active)
        .fetch_optional(&self.pool)
        .await?,
    )
  }

  async fn upsert_product_by_slug(&self, input: &ProductInput) -> Result<SeedOutcome> {
    // xmax = 0 only for freshly inserted rows.
    let inserted: bool = sqlx::query_scalar(
      "INSERT INTO products (slug, name, description, category, price_cents, stock_quantity, image_url, is_active) \
       VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
       ON CONFLICT (slug) DO UPDATE SET name = EXCLUDED.name, description = EXCLUDED.description, \
       category = EXCLUDED.category, price_cents = EXCLUDED.price_cents, image_url = EXCLUDED.image_url, \
       updated_at = NOW() \
       RETURNING (xmax = 0)",
    )
    .bind(&input.slug)
    .bind(&input.name)
    .bind(&input.description)
    .bind(&input.category)
    .bind(input.price_cents)
    .bind(input.stock_quantity)
    .bind(&input.image_url)
    .bind(input.is_active)
    .fetch_one(&self.pool)
    .await?;
    Ok(if inserted { SeedOutcome::Inserted } else { SeedOutcome::Updated })
  }

  async fn set_stock(&self, id: Uuid, quantity: i32) -> Result<Option<Product>> {
    let sql = format!(
      "UPDATE products SET stock_quantity = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
      PRODUCT_COLUMNS
    );
    Ok(
      sqlx::query_as::<_, Product>(&sql)
        .bind(id)
        .bind(quantity)
        .fetch_optional(&self.pool)
        .await?,
    )
  }

  async fn adjust_stock(&self, id: Uuid, delta: i32) -> Result<StockChange> {
    let sql = format!(
      "UPDATE products SET stock_quantity = stock_quantity + $2, updated_at = NOW() \
       WHERE id = $1 AND stock_quantity + $2 >= 0 RETURNING {}",
      PRODUCT_COLUMNS
    );
    let updated = sqlx::query_as::<_, Product>(&sql)
      .bind(id)
      .bind(delta)
      .fetch_optional(&self.pool)
      .await?;
    if let Some(product) = updated {
      return Ok(StockChange::Applied(product));
    }
    let available: Option<i32> = sqlx::query_scalar("SELECT stock_quantity FROM products WHERE id = $1")
      .bind(id)
      .fetch_optional(&self.pool)
      .await?;
    Ok(match available {
      Some(available) => StockChange::Insufficient { available },
      None => StockChange::NotFound,
    })
  }

  async fn low_stock(&self, threshold: i32) -> Result<Vec<Product>> {
    let sql = format!(
      "SELECT {} FROM products WHERE is_active AND stock_quantity <= $1 ORDER BY stock_quantity, name",
      PRODUCT_COLUMNS
    );
    Ok(sqlx::query_as::<_, Product>(&sql).bind(threshold).fetch_all(&self.pool).await?)
  }
}

#[async_trait]
impl SavedCartStore for PgBackend {
  async fn load_saved_cart(&self, user_id: Uuid) -> Result<Option<SavedCart>> {
    let row = sqlx::query_as::<_, (Uuid, Json<Vec<CartLine>>, DateTime<Utc>)>(
      "SELECT user_id, items, updated_at FROM saved_carts WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_optional(&self.pool)
    .await?;
    Ok(row.map(|(user_id, Json(items), updated_at)| SavedCart {
      user_id,
      items,
      updated_at,
    }))
  }

  async fn upsert_saved_cart(&self, user_id: Uuid, items: &[CartLine]) -> Result<()> {
    sqlx::query(
      "INSERT INTO saved_carts (user_id, items, updated_at) VALUES ($1, $2, NOW()) \
       ON CONFLICT (user_id) DO UPDATE SET items = EXCLUDED.items, updated_at = NOW()",
    )
    .bind(user_id)
    .bind(Json(items))
    .execute(&self.pool)
    .await?;
    Ok(())
  }
}

#[async_trait]
impl UserStore for PgBackend {
  async fn create_user(
    &self,
    email: &str,
    password_hash: &str,
    full_name: Option<&str>,
    role: UserRole,
  ) -> Result<User> {
    let sql = format!(
      "INSERT INTO users (email, password_hash, full_name, role) VALUES ($1, $2, $3, $4) RETURNING {}",
      USER_COLUMNS
    );
    sqlx::query_as::<_, User>(&sql)
      .bind(email)
      .bind(password_hash)
      .bind(full_name)
      .bind(role)
      .fetch_one(&self.pool)
      .await
      .map_err(|e| match AppError::from_unique_violation(e, "Account") {
        AppError::Conflict(_) => AppError::Conflict("An account with this email already exists.".to_string()),
        other => other,
      })
  }

  async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
    let sql = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
    Ok(sqlx::query_as::<_, User>(&sql).bind(email).fetch_optional(&self.pool).await?)
  }

  async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
    let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
    Ok(sqlx::query_as::<_, User>(&sql).bind(id).fetch_optional(&self.pool).await?)
  }

  async fn list_users(&self) -> Result<Vec<User>> {
    let sql = format!("SELECT {} FROM users ORDER BY email", USER_COLUMNS);
    Ok(sqlx::query_as::<_, User>(&sql).fetch_all(&self.pool).await?)
  }

  async fn set_user_role(&self, id: Uuid, role: UserRole) -> Result<Option<User>> {
    let sql = format!(
      "UPDATE users SET role = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
      USER_COLUMNS
    );
    Ok(
      sqlx::query_as::<_, User>(&sql)
        .bind(id)
        .bind(role)
        .fetch_optional(&self.pool)
        .await?,
    )
  }
}

#[async_trait]
impl PaymentMethodStore for PgBackend {
  async fn list_payment_methods(&self, include_inactive: bool) -> Result<Vec<PaymentMethod>> {
    let sql = format!(
      "SELECT {} FROM payment_methods WHERE ($1 OR is_active) ORDER BY sort_order, name",
      PAYMENT_METHOD_COLUMNS
    );
    Ok(
      sqlx::query_as::<_, PaymentMethod>(&sql)
        .bind(include_inactive)
        .fetch_all(&self.pool)
        .await?,
    )
  }

  async fn get_payment_method(&self, id: Uuid) -> Result<Option<PaymentMethod>> {
    let sql = format!("SELECT {} FROM payment_methods WHERE id = $1", PAYMENT_METHOD_COLUMNS);
    Ok(sqlx::query_as::<_, PaymentMethod>(&sql).bind(id).fetch_optional(&self.pool).await?)
  }

  async fn insert_payment_method(&self, input: &PaymentMethodInput) -> Result<PaymentMethod> {
    let sql = format!(
      "INSERT INTO payment_methods (code, name, kind, instructions, is_active, sort_order) \
       VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
      PAYMENT_METHOD_COLUMNS
    );
    sqlx::query_as::<_, PaymentMethod>(&sql)
      .bind(&input.code)
      .bind(&input.name)
      .bind(input.kind)
      .bind(&input.instructions)
      .bind(input.is_active)
      .bind(input.sort_order)
      .fetch_one(&self.pool)
      .await
      .map_err(|e| AppError::from_unique_violation(e, "Payment method code"))
  }

  async fn update_payment_method(&self, id: Uuid, input: &PaymentMethodInput) -> Result<Option<PaymentMethod>> {
    let sql = format!(
      "UPDATE payment_methods SET code = $2, name = $3, kind = $4, instructions = $5, is_active = $6, \
       sort_order = $7 WHERE id = $1 RETURNING {}",
      PAYMENT_METHOD_COLUMNS
    );
    sqlx::query_as::<_, PaymentMethod>(&sql)
      .bind(id)
      .bind(&input.code)
      .bind(&input.name)
      .bind(input.kind)
      .bind(&input.instructions)
      .bind(input.is_active)
      .bind(input.sort_order)
      .fetch_optional(&self.pool)
      .await
      .map_err(|e| AppError::from_unique_violation(e, "Payment method code"))
  }
}

#[async_trait]
impl DiscountStore for PgBackend {
  async fn list_discounts(&self) -> Result<Vec<DiscountCode>> {
    let sql = format!("SELECT {} FROM discount_codes ORDER BY created_at DESC", DISCOUNT_COLUMNS);
    Ok(sqlx::query_as::<_, DiscountCode>(&sql).fetch_all(&self.pool).await?)
  }

  async fn find_discount_by_code(&self, code: &str) -> Result<Option<DiscountCode>> {
    let sql = format!("SELECT {} FROM discount_codes WHERE code = $1", DISCOUNT_COLUMNS);
    Ok(
      sqlx::query_as::<_, DiscountCode>(&sql)
        .bind(normalize_code(code))
        .fetch_optional(&self.pool)
        .await?,
    )
  }

  async fn insert_discount(&self, input: &DiscountInput) -> Result<DiscountCode> {
    let sql = format!(
      "INSERT INTO discount_codes (code, kind, value, min_order_cents, max_uses, starts_at, expires_at, is_active) \
       VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {}",
      DISCOUNT_COLUMNS
    );
    sqlx::query_as::<_, DiscountCode>(&sql)
      .bind(normalize_code(&input.code))
      .bind(input.kind)
      .bind(input.value)
      .bind(input.min_order_cents)
      .bind(input.max_uses)
      .bind(input.starts_at)
      .bind(input.expires_at)
      .bind(input.is_active)
      .fetch_one(&self.pool)
      .await
      .map_err(|e| AppError::from_unique_violation(e, "Discount code"))
  }

  async fn update_discount(&self, id: Uuid, input: &DiscountInput) -> Result<Option<DiscountCode>> {
    let sql = format!(
      "UPDATE discount_codes SET code = $2, kind = $3, value = $4, min_order_cents = $5, max_uses = $6, \
       starts_at = $7, expires_at = $8, is_active = $9 WHERE id = $1 RETURNING {}",
      DISCOUNT_COLUMNS
    );
    sqlx::query_as::<_, DiscountCode>(&sql)
      .bind(id)
      .bind(normalize_code(&input.code))
      .bind(input.kind)
      .bind(input.value)
      .bind(input.min_order_cents)
      .bind(input.max_uses)
      .bind(input.starts_at)
      .bind(input.expires_at)
      .bind(input.is_active)
      .fetch_optional(&self.pool)
      .await
      .map_err(|e| AppError::from_unique_violation(e, "Discount code"))
  }

  async fn redeem_discount(&self, id: Uuid) -> Result<bool> {
    let result = sqlx::query(
      "UPDATE discount_codes SET used_count = used_count + 1 \
       WHERE id = $1 AND (max_uses IS NULL OR used_count < max_uses)",
    )
    .bind(id)
    .execute(&self.pool)
    .await?;
    Ok(result.rows_affected() == 1)
  }
}

#[async_trait]
impl OrderStore for PgBackend {
  #[instrument(name = "PgBackend::create_order", skip(self, new_order), fields(order_id = %new_order.id), err(Display))]
  async fn create_order(&self, new_order: &NewOrder) -> Result<(Order, Vec<OrderItem>)> {
    let mut tx = self.pool.begin().await?;

    let sql = format!(
      "INSERT INTO orders (id, user_id, status, subtotal_cents, discount_cents, total_cents, currency, \
       discount_code, payment_method_id, shipping_name, shipping_email, shipping_address) \
       VALUES ($1, $2, 'pending', $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING {}",
      ORDER_COLUMNS
    );
    let order = sqlx::query_as::<_, Order>(&sql)
      .bind(new_order.id)
      .bind(new_order.user_id)
      .bind(new_order.subtotal_cents)
      .bind(new_order.discount_cents)
      .bind(new_order.total_cents)
      .bind(&new_order.currency)
      .bind(&new_order.discount_code)
      .bind(new_order.payment_method_id)
      .bind(&new_order.shipping_name)
      .bind(&new_order.shipping_email)
      .bind(&new_order.shipping_address)
      .fetch_one(&mut *tx)
      .await
      .map_err(|e| AppError::from_unique_violation(e, "Order"))?;

    let item_sql = format!(
      "INSERT INTO order_items (order_id, product_id, product_name, quantity, unit_price_cents) \
       VALUES ($1, $2, $3, $4, $5) RETURNING {}",
      ORDER_ITEM_COLUMNS
    );
    let mut items = Vec::with_capacity(new_order.items.len());
    for item in &new_order.items {
      let row = sqlx::query_as::<_, OrderItem>(&item_sql)
        .bind(order.id)
        .bind(item.product_id)
        .bind(&item.product_name)
        .bind(item.quantity)
        .bind(item.unit_price_cents)
        .fetch_one(&mut *tx)
        .await?;
      items.push(row);
    }

    tx.commit().await?;
    Ok((order, items))
  }

  async fn get_order(&self, id: Uuid) -> Result<Option<Order>> {
    let sql = format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS);
    Ok(sqlx::query_as::<_, Order>(&sql).bind(id).fetch_optional(&self.pool).await?)
  }

  async fn order_items(&self, order_id: Uuid) -> Result<Vec<OrderItem>> {
    let sql = format!(
      "SELECT {} FROM order_items WHERE order_id = $1 ORDER BY product_name",
      ORDER_ITEM_COLUMNS
    );
    Ok(sqlx::query_as::<_, OrderItem>(&sql).bind(order_id).fetch_all(&self.pool).await?)
  }

  async fn list_orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>> {
    let sql = format!(
      "SELECT {} FROM orders WHERE user_id = $1 ORDER BY created_at DESC",
      ORDER_COLUMNS
    );
    Ok(sqlx::query_as::<_, Order>(&sql).bind(user_id).fetch_all(&self.pool).await?)
  }

  async fn list_orders(&self, status: Option<OrderStatus>) -> Result<Vec<Order>> {
    let sql = format!(
      "SELECT {} FROM orders WHERE ($1::order_status_enum IS NULL OR status = $1) ORDER BY created_at DESC",
      ORDER_COLUMNS
    );
    Ok(sqlx::query_as::<_, Order>(&sql).bind(status).fetch_all(&self.pool).await?)
  }

  async fn update_order_status(
    &self,
    id: Uuid,
    from: OrderStatus,
    to: OrderStatus,
    update: &OrderStatusUpdate,
  ) -> Result<StatusChange> {
    let sql = format!(
      "UPDATE orders SET status = $3, tracking_number = COALESCE($4, tracking_number), \
       payment_reference = COALESCE($5, payment_reference), updated_at = NOW() \
       WHERE id = $1 AND status = $2 RETURNING {}",
      ORDER_COLUMNS
    );
    let updated = sqlx::query_as::<_, Order>(&sql)
      .bind(id)
      .bind(from)
      .bind(to)
      .bind(&update.tracking_number)
      .bind(&update.payment_reference)
      .fetch_optional(&self.pool)
      .await?;
    if let Some(order) = updated {
      return Ok(StatusChange::Applied(order));
    }
    let current: Option<OrderStatus> = sqlx::query_scalar("SELECT status FROM orders WHERE id = $1")
      .bind(id)
      .fetch_optional(&self.pool)
      .await?;
    Ok(match current {
      Some(current) => StatusChange::Stale { current },
      None => StatusChange::NotFound,
    })
  }
}

#[async_trait]
impl InvoiceStore for PgBackend {
  async fn create_invoice(&self, order: &Order, status: InvoiceStatus) -> Result<Invoice> {
    let sequence: i64 = sqlx::query_scalar("SELECT nextval('invoice_number_seq')")
      .fetch_one(&self.pool)
      .await?;
    let issued_at = Utc::now();
    let paid_at = (status == InvoiceStatus::Paid).then_some(issued_at);
    let sql = format!(
      "INSERT INTO invoices (order_id, number, status, total_cents, currency, issued_at, paid_at) \
       VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {}",
      INVOICE_COLUMNS
    );
    sqlx::query_as::<_, Invoice>(&sql)
      .bind(order.id)
      .bind(invoice_number(issued_at, sequence))
      .bind(status)
      .bind(order.total_cents)
      .bind(&order.currency)
      .bind(issued_at)
      .bind(paid_at)
      .fetch_one(&self.pool)
      .await
      .map_err(|e| match AppError::from_unique_violation(e, "Invoice") {
        AppError::Conflict(_) => AppError::Conflict("Order already has an invoice.".to_string()),
        other => other,
      })
  }

  async fn get_invoice(&self, id: Uuid) -> Result<Option<Invoice>> {
    let sql = format!("SELECT {} FROM invoices WHERE id = $1", INVOICE_COLUMNS);
    Ok(sqlx::query_as::<_, Invoice>(&sql).bind(id).fetch_optional(&self.pool).await?)
  }

  async fn invoice_for_order(&self, order_id: Uuid) -> Result<Option<Invoice>> {
    let sql = format!("SELECT {} FROM invoices WHERE order_id = $1", INVOICE_COLUMNS);
    Ok(
      sqlx::query_as::<_, Invoice>(&sql)
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?,
    )
  }

  async fn list_invoices(&self) -> Result<Vec<Invoice>> {
    let sql = format!("SELECT {} FROM invoices ORDER BY issued_at DESC", INVOICE_COLUMNS);
    Ok(sqlx::query_as::<_, Invoice>(&sql).fetch_all(&self.pool).await?)
  }

  async fn set_invoice_status(&self, id: Uuid, status: InvoiceStatus) -> Result<Option<Invoice>> {
    let sql = format!(
      "UPDATE invoices SET status = $2, \
       paid_at = CASE WHEN $2 = 'paid'::invoice_status_enum THEN COALESCE(paid_at, NOW()) ELSE paid_at END \
       WHERE id = $1 RETURNING {}",
      INVOICE_COLUMNS
    );
    Ok(
      sqlx::query_as::<_, Invoice>(&sql)
        .bind(id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await?,
    )
  }
}

#[async_trait]
impl AppointmentStore for PgBackend {
  async fn list_slots(&self, query: &SlotQuery) -> Result<Vec<AppointmentSlot>> {
    let sql = format!(
      "SELECT {} FROM appointment_slots \
       WHERE ($1::uuid IS NULL OR nutritionist_id = $1) \
       AND ($2::timestamptz IS NULL OR starts_at >= $2) \
       AND ($3::timestamptz IS NULL OR starts_at < $3) \
       AND (NOT $4 OR NOT is_booked) \
       ORDER BY starts_at",
      SLOT_COLUMNS
    );
    Ok(
      sqlx::query_as::<_, AppointmentSlot>(&sql)
        .bind(query.nutritionist_id)
        .bind(query.from)
        .bind(query.to)
        .bind(query.only_available)
        .fetch_all(&self.pool)
        .await?,
    )
  }

  async fn insert_slots(
    &self,
    nutritionist_id: Uuid,
    windows: &[(DateTime<Utc>, DateTime<Utc>)],
  ) -> Result<Vec<AppointmentSlot>> {
    let mut tx = self.pool.begin().await?;
    let sql = format!(
      "INSERT INTO appointment_slots (nutritionist_id, starts_at, ends_at) VALUES ($1, $2, $3) RETURNING {}",
      SLOT_COLUMNS
    );
    let mut created = Vec::with_capacity(windows.len());
    for (starts_at, ends_at) in windows {
      let slot = sqlx::query_as::<_, AppointmentSlot>(&sql)
        .bind(nutritionist_id)
        .bind(starts_at)
        .bind(ends_at)
        .fetch_one(&mut *tx)
        .await?;
      created.push(slot);
    }
    tx.commit().await?;
    Ok(created)
  }

  #[instrument(name = "PgBackend::book_slot", skip(self, notes), err(Display))]
  async fn book_slot(&self, slot_id: Uuid, customer_id: Uuid, notes: Option<&str>) -> Result<BookingOutcome> {
    let mut tx = self.pool.begin().await?;
    let flipped: Option<(Uuid, DateTime<Utc>)> = sqlx::query_as(
      "UPDATE appointment_slots SET is_booked = TRUE WHERE id = $1 AND NOT is_booked \
       RETURNING nutritionist_id, starts_at",
    )
    .bind(slot_id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some((nutritionist_id, starts_at)) = flipped else {
      let exists: Option<Uuid> = sqlx::query_scalar("SELECT id FROM appointment_slots WHERE id = $1")
        .bind(slot_id)
        .fetch_optional(&mut *tx)
        .await?;
      tx.rollback().await?;
      return Ok(if exists.is_some() {
        BookingOutcome::SlotTaken
      } else {
        BookingOutcome::SlotNotFound
      });
    };

    let sql = format!(
      "INSERT INTO appointments (slot_id, customer_id, nutritionist_id, starts_at, notes, status) \
       VALUES ($1, $2, $3, $4, $5, 'booked') RETURNING {}",
      APPOINTMENT_COLUMNS
    );
    let appointment = sqlx::query_as::<_, Appointment>(&sql)
      .bind(slot_id)
      .bind(customer_id)
      .bind(nutritionist_id)
      .bind(starts_at)
      .bind(notes)
      .fetch_one(&mut *tx)
      .await?;
    tx.commit().await?;
    Ok(BookingOutcome::Booked(appointment))
  }

  async fn get_appointment(&self, id: Uuid) -> Result<Option<Appointment>> {
    let sql = format!("SELECT {} FROM appointments WHERE id = $1", APPOINTMENT_COLUMNS);
    Ok(sqlx::query_as::<_, Appointment>(&sql).bind(id).fetch_optional(&self.pool).await?)
  }

  async fn list_appointments_for_customer(&self, customer_id: Uuid) -> Result<Vec<Appointment>> {
    let sql = format!(
      "SELECT {} FROM appointments WHERE customer_id = $1 ORDER BY starts_at",
      APPOINTMENT_COLUMNS
    );
    Ok(
      sqlx::query_as::<_, Appointment>(&sql)
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?,
    )
  }

  async fn list_appointments_for_nutritionist(&self, nutritionist_id: Uuid) -> Result<Vec<Appointment>> {
    let sql = format!(
      "SELECT {} FROM appointments WHERE nutritionist_id = $1 ORDER BY starts_at",
      APPOINTMENT_COLUMNS
    );
    Ok(
      sqlx::query_as::<_, Appointment>(&sql)
        .bind(nutritionist_id)
        .fetch_all(&self.pool)
        .await?,
    )
  }

  async fn cancel_appointment(&self, id: Uuid) -> Result<Option<Appointment>> {
    let mut tx = self.pool.begin().await?;
    let sql = format!(
      "UPDATE appointments SET status = $2 WHERE id = $1 AND status = $3 RETURNING {}",
      APPOINTMENT_COLUMNS
    );
    let cancelled = sqlx::query_as::<_, Appointment>(&sql)
      .bind(id)
      .bind(AppointmentStatus::Cancelled)
      .bind(AppointmentStatus::Booked)
      .fetch_optional(&mut *tx)
      .await?;

    let result = match cancelled {
      Some(appointment) => {
        sqlx::query("UPDATE appointment_slots SET is_booked = FALSE WHERE id = $1")
          .bind(appointment.slot_id)
          .execute(&mut *tx)
          .await?;
        Some(appointment)
      }
      None => {
        let sql = format!("SELECT {} FROM appointments WHERE id = $1", APPOINTMENT_COLUMNS);
        sqlx::query_as::<_, Appointment>(&sql)
          .bind(id)
          .fetch_optional(&mut *tx)
          .await?
      }
    };
    tx.commit().await?;
    Ok(result)
  }
}
