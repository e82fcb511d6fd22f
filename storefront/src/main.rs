// storefront/src/main.rs

use std::sync::Arc;
use std::time::Duration;

use actix_web::{web, App, HttpServer};
use storefront::catalog;
use storefront::config::{AppConfig, StorageBackend};
use storefront::errors::{AppError, Result as AppResult};
use storefront::services::mailer::LogMailer;
use storefront::services::payment_gateway::MockPaymentGateway;
use storefront::state::AppState;
use storefront::store::{Backend, MemoryBackend, PgBackend};
use storefront::{telemetry, web as routes};

const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(15 * 60);

async fn build_backend(config: &AppConfig) -> AppResult<Arc<dyn Backend>> {
  match config.storage_backend {
    StorageBackend::Postgres => {
      let url = config
        .database_url
        .as_deref()
        .ok_or_else(|| AppError::Config("DATABASE_URL is required for the postgres backend".to_string()))?;
      let backend = PgBackend::connect(url, config.database_max_connections).await?;
      tracing::info!("Connected to the database and applied migrations.");
      Ok(Arc::new(backend))
    }
    StorageBackend::Memory => {
      tracing::warn!("Using the in-memory backend; data is lost on restart.");
      Ok(Arc::new(MemoryBackend::new()))
    }
  }
}

async fn seed_if_requested(config: &AppConfig, backend: &dyn Backend) -> AppResult<()> {
  if !config.seed_db {
    return Ok(());
  }
  let entries = catalog::load_seed_file(&config.seed_catalog_path).await?;
  let report = catalog::seed_catalog(backend, &entries).await?;
  tracing::info!(
    inserted = report.inserted,
    updated = report.updated,
    skipped = report.skipped.len(),
    "Catalog seeded."
  );
  Ok(())
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
  telemetry::init();
  tracing::info!("Starting storefront server...");

  let app_config = match AppConfig::from_env() {
    Ok(cfg) => cfg,
    Err(e) => {
      tracing::error!(error = %e, "Failed to load application configuration.");
      return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()));
    }
  };

  let backend = match build_backend(&app_config).await {
    Ok(backend) => backend,
    Err(e) => {
      tracing::error!(error = %e, "Failed to initialise storage.");
      return Err(std::io::Error::other(e.to_string()));
    }
  };
  if let Err(e) = seed_if_requested(&app_config, backend.as_ref()).await {
    tracing::error!(error = %e, "Catalog seeding failed; continuing without it.");
  }

  let mailer = Arc::new(LogMailer::new(app_config.mail_sender.clone()));
  let payments = MockPaymentGateway::new(app_config.payment_gateway_account_id.clone());
  let server_address = format!("{}:{}", app_config.server_host, app_config.server_port);
  let appointments_enabled = app_config.appointments_enabled;
  let app_state = AppState::new(app_config, backend, mailer, payments);
  tracing::info!(pipelines = app_state.flows.len(), "Workflow pipelines registered.");

  let sessions = app_state.sessions.clone();
  let carts = app_state.carts.clone();
  let cart_idle_ttl = app_state.config.cart_idle_ttl;
  tokio::spawn(async move {
    let mut ticker = tokio::time::interval(SESSION_PURGE_INTERVAL);
    loop {
      ticker.tick().await;
      let purged = sessions.purge_expired();
      if purged > 0 {
        tracing::debug!(purged, "Expired auth sessions purged.");
      }
      carts.purge_idle(cart_idle_ttl);
    }
  });

  tracing::info!("Binding server to {}...", server_address);
  HttpServer::new(move || {
    App::new()
      .app_data(web::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(|cfg| routes::configure_app_routes(cfg, appointments_enabled))
  })
  .bind(&server_address)?
  .run()
  .await
}
