// tests/common/mod.rs
#![allow(dead_code)]

use once_cell::sync::Lazy;
use std::sync::Arc;
use std::time::Duration;
use storefront::config::AppConfig;
use storefront::models::{PaymentKind, PaymentMethod, PaymentMethodInput, Product, ProductInput, User, UserRole};
use storefront::services::auth_service;
use storefront::services::mailer::LogMailer;
use storefront::services::payment_gateway::MockPaymentGateway;
use storefront::state::AppState;
use storefront::store::{CatalogStore, MemoryBackend, PaymentMethodStore, UserStore};
use tracing::Level;

pub const PASSWORD: &str = "correct-horse-battery";

static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

/// Application wired to the in-memory backend, with handles to the concrete mocks.
pub struct TestApp {
  pub state: AppState,
  pub backend: Arc<MemoryBackend>,
  pub mailer: Arc<LogMailer>,
}

pub fn test_config() -> AppConfig {
  let mut config = AppConfig::for_memory_backend();
  config.cart_sync_debounce = Duration::from_millis(800);
  config.inventory_tool_api_key = Some("tool-secret".to_string());
  config
}

pub fn test_app() -> TestApp {
  test_app_with(test_config())
}

pub fn test_app_with(config: AppConfig) -> TestApp {
  setup_tracing();
  let backend = Arc::new(MemoryBackend::new());
  let mailer = Arc::new(LogMailer::new(config.mail_sender.clone()));
  let payments = MockPaymentGateway::new(config.payment_gateway_account_id.clone()).with_latency(Duration::ZERO);
  let state = AppState::new(config, backend.clone(), mailer.clone(), payments);
  TestApp { state, backend, mailer }
}

impl TestApp {
  pub async fn product(&self, slug: &str, price_cents: i64, stock: i32) -> Product {
    self
      .backend
      .insert_product(&ProductInput {
        slug: slug.to_string(),
        name: slug.replace('-', " "),
        description: Some(format!("{} description", slug)),
        category: Some("protein".to_string()),
        price_cents,
        stock_quantity: stock,
        image_url: None,
        is_active: true,
      })
      .await
      .unwrap()
  }

  pub async fn user(&self, email: &str, role: UserRole) -> User {
    let hash = auth_service::hash_password(PASSWORD).unwrap();
    self.backend.create_user(email, &hash, Some("Test User"), role).await.unwrap()
  }

  pub async fn payment_method(&self, code: &str, kind: PaymentKind) -> PaymentMethod {
    self
      .backend
      .insert_payment_method(&PaymentMethodInput {
        code: code.to_string(),
        name: code.replace('_', " "),
        kind,
        instructions: None,
        is_active: true,
        sort_order: 0,
      })
      .await
      .unwrap()
  }

  pub async fn stock_of(&self, product: &Product) -> i32 {
    self.backend.get_product(product.id).await.unwrap().unwrap().stock_quantity
  }

  /// Issues a bearer token directly, bypassing the sign-in pipeline.
  pub fn token_for(&self, user: &User) -> String {
    self.state.sessions.issue(user.id, None).0
  }
}
