// storefront/src/state.rs

use crate::cart::CartSessions;
use crate::config::AppConfig;
use crate::errors::AppError;
use crate::pipelines;
use crate::services::inventory_tool::InventoryTool;
use crate::services::mailer::Mailer;
use crate::services::payment_gateway::MockPaymentGateway;
use crate::services::sessions::AuthSessions;
use crate::store::Backend;
use shopflow::FlowRegistry;
use std::sync::Arc;

/// Shared application state, cloned into every worker and pipeline context.
#[derive(Clone)]
pub struct AppState {
  pub backend: Arc<dyn Backend>,
  pub flows: Arc<FlowRegistry<AppError>>,
  pub config: Arc<AppConfig>,
  pub carts: Arc<CartSessions>,
  pub sessions: Arc<AuthSessions>,
  pub mailer: Arc<dyn Mailer>,
  pub payments: Arc<MockPaymentGateway>,
  pub inventory_tool: Arc<InventoryTool>,
}

impl AppState {
  /// Wires every shared component and registers the workflow pipelines.
  pub fn new(
    config: AppConfig,
    backend: Arc<dyn Backend>,
    mailer: Arc<dyn Mailer>,
    payments: MockPaymentGateway,
  ) -> Self {
    let flows = Arc::new(FlowRegistry::<AppError>::new());
    pipelines::register_all_pipelines(&flows);

    Self {
      carts: Arc::new(CartSessions::new(backend.clone(), config.cart_sync_debounce)),
      sessions: Arc::new(AuthSessions::new(config.session_ttl)),
      inventory_tool: Arc::new(InventoryTool::new(backend.clone(), config.low_stock_threshold)),
      payments: Arc::new(payments),
      config: Arc::new(config),
      backend,
      flows,
      mailer,
    }
  }
}
