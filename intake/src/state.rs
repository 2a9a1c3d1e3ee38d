// order_intake/src/state.rs

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::order_code::OrderCodeGenerator;
use crate::pipelines::contexts::OrderIntakeCtx;
use crate::pipelines::order_intake::build_order_intake_pipeline;
use crate::pricing::PricingEngine;
use crate::services::audit::{AuditLogger, TracingAuditLogger};
use crate::services::mailer::LogMailer;
use crate::services::notify::{EmailNotifier, NotificationDispatcher};
use crate::services::payment::{PaymentCaptureAdapter, PaymentGateway, UnconfiguredGateway};
use crate::services::tax::{RateTableTax, TaxService};
use crate::store::{CatalogStore, CouponStore, OrderStore, SchemaGuard, SchemaProbe, StockLedger};
use std::sync::Arc;
use stepflow::Pipeline;

/// Every collaborator the order pipeline consumes, as trait objects.
pub struct Collaborators {
  pub catalog: Arc<dyn CatalogStore>,
  pub coupons: Arc<dyn CouponStore>,
  pub stock: Arc<dyn StockLedger>,
  pub orders: Arc<dyn OrderStore>,
  pub schema_probe: Arc<dyn SchemaProbe>,
  pub tax: Arc<dyn TaxService>,
  pub payment_gateway: Arc<dyn PaymentGateway>,
  pub audit: Arc<dyn AuditLogger>,
  pub notifier: Arc<dyn NotificationDispatcher>,
}

impl Collaborators {
  /// One backend for every store role. Tax comes from the configured rate
  /// table; payments, audit and mail start with their offline defaults.
  pub fn from_store<S>(store: Arc<S>, config: &AppConfig) -> Self
  where
    S: CatalogStore + CouponStore + StockLedger + OrderStore + SchemaProbe + 'static,
  {
    let orders: Arc<dyn OrderStore> = store.clone();
    let notifier = EmailNotifier::new(
      orders.clone(),
      Arc::new(LogMailer),
      config.notify_sender.clone(),
      config.notify_admin_email.clone(),
    );
    Self {
      catalog: store.clone(),
      coupons: store.clone(),
      stock: store.clone(),
      orders,
      schema_probe: store,
      tax: Arc::new(RateTableTax::new(config.tax_rates.clone(), config.tax_default_rate)),
      payment_gateway: Arc::new(UnconfiguredGateway),
      audit: Arc::new(TracingAuditLogger),
      notifier: Arc::new(notifier),
    }
  }

  pub fn with_payment_gateway(mut self, gateway: Arc<dyn PaymentGateway>) -> Self {
    self.payment_gateway = gateway;
    self
  }

  pub fn with_tax(mut self, tax: Arc<dyn TaxService>) -> Self {
    self.tax = tax;
    self
  }

  pub fn with_audit(mut self, audit: Arc<dyn AuditLogger>) -> Self {
    self.audit = audit;
    self
  }

  pub fn with_notifier(mut self, notifier: Arc<dyn NotificationDispatcher>) -> Self {
    self.notifier = notifier;
    self
  }

  pub fn with_orders(mut self, orders: Arc<dyn OrderStore>) -> Self {
    self.orders = orders;
    self
  }
}

/// Long-lived services shared by every order submission.
pub struct IntakeServices {
  pub config: Arc<AppConfig>,
  pub catalog: Arc<dyn CatalogStore>,
  pub coupons: Arc<dyn CouponStore>,
  pub stock: Arc<dyn StockLedger>,
  pub orders: Arc<dyn OrderStore>,
  pub schema_probe: Arc<dyn SchemaProbe>,
  pub schema_guard: SchemaGuard,
  pub pricing: PricingEngine,
  pub payments: PaymentCaptureAdapter,
  pub order_codes: OrderCodeGenerator,
  pub audit: Arc<dyn AuditLogger>,
  pub notifier: Arc<dyn NotificationDispatcher>,
}

impl IntakeServices {
  pub fn new(config: Arc<AppConfig>, collaborators: Collaborators) -> Self {
    let pricing = PricingEngine::new(config.shipping_rates.clone(), config.tax_base, collaborators.tax);
    let payments = PaymentCaptureAdapter::new(collaborators.payment_gateway, config.payment_status_check);
    let order_codes = OrderCodeGenerator::new(config.order_code_max_attempts);
    Self {
      catalog: collaborators.catalog,
      coupons: collaborators.coupons,
      stock: collaborators.stock,
      orders: collaborators.orders,
      schema_probe: collaborators.schema_probe,
      schema_guard: SchemaGuard::new(),
      pricing,
      payments,
      order_codes,
      audit: collaborators.audit,
      notifier: collaborators.notifier,
      config,
    }
  }
}

#[derive(Clone)]
pub struct AppState {
  pub services: Arc<IntakeServices>,
  pub intake_pipeline: Arc<Pipeline<OrderIntakeCtx, AppError>>,
}

impl AppState {
  pub fn new(services: Arc<IntakeServices>) -> Self {
    Self {
      services,
      intake_pipeline: Arc::new(build_order_intake_pipeline()),
    }
  }
}
