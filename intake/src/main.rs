// order_intake/src/main.rs

use actix_web::{web as actix_data, App, HttpServer};
use order_intake::config::{AppConfig, StoreBackend};
use order_intake::errors::AppError;
use order_intake::services::audit::PgAuditLogger;
use order_intake::services::payment::{HttpPaymentProcessor, PaymentGateway};
use order_intake::services::secrets::EnvSecretStore;
use order_intake::state::{AppState, Collaborators, IntakeServices};
use order_intake::store::{MemoryStore, PgStore};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;

async fn build_collaborators(config: &AppConfig) -> Result<Collaborators, AppError> {
  let collaborators = match config.store_backend {
    StoreBackend::Memory => {
      tracing::warn!("Using the in-memory store with demo data; nothing is persisted.");
      let store = Arc::new(MemoryStore::seeded_demo().with_idempotency_ttl(config.idempotency_ttl));
      Collaborators::from_store(store, config)
    }
    StoreBackend::Postgres => {
      let database_url = config
        .database_url
        .as_deref()
        .ok_or_else(|| AppError::Config("DATABASE_URL is required for the postgres backend".to_string()))?;
      let pool = PgPoolOptions::new().max_connections(10).connect(database_url).await?;
      tracing::info!("Successfully connected to the database.");
      let store = Arc::new(PgStore::new(pool.clone(), config.idempotency_ttl));
      Collaborators::from_store(store, config).with_audit(Arc::new(PgAuditLogger::new(pool)))
    }
  };

  match &config.payment_processor_url {
    Some(url) => {
      let gateway: Arc<dyn PaymentGateway> =
        Arc::new(HttpPaymentProcessor::new(url, config.payment_timeout, &EnvSecretStore)?);
      tracing::info!(processor_url = %url, "Payment processor configured.");
      Ok(collaborators.with_payment_gateway(gateway))
    }
    None => {
      tracing::warn!("PAYMENT_PROCESSOR_URL not set; only cash and check orders can be placed.");
      Ok(collaborators)
    }
  }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
  tracing_subscriber::fmt()
    .with_max_level(Level::INFO)
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .with_span_events(FmtSpan::CLOSE)
    .init();

  tracing::info!("Starting order intake server...");

  let app_config = match AppConfig::from_env() {
    Ok(cfg) => Arc::new(cfg),
    Err(e) => {
      tracing::error!(error = %e, "Failed to load application configuration.");
      return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()));
    }
  };

  let collaborators = match build_collaborators(&app_config).await {
    Ok(collaborators) => collaborators,
    Err(e) => {
      tracing::error!(error = %e, "Failed to initialise collaborators.");
      return Err(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()));
    }
  };
  let services = Arc::new(IntakeServices::new(app_config.clone(), collaborators));

  // Verify once at startup; requests re-check only while this has not succeeded.
  if let Err(e) = services.schema_guard.ensure(services.schema_probe.as_ref()).await {
    tracing::error!(error = %e, "Schema verification failed at startup; order creation will retry it.");
  }

  let app_state = AppState::new(services);

  let server_address = format!("{}:{}", app_config.server_host, app_config.server_port);
  tracing::info!("Attempting to bind server to {}...", server_address);

  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(order_intake::web::configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await
}
