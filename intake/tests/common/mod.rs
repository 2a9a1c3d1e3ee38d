// tests/common/mod.rs
#![allow(dead_code)]

use async_trait::async_trait;
use once_cell::sync::Lazy;
use order_intake::config::{AppConfig, StoreBackend};
use order_intake::errors::{AppError, Result};
use order_intake::models::{
  CheckoutOptions, LineRequest, NewOrder, Order, OrderLineItem, OrderRequest, PaymentMethod, ShippingAddress,
  StockKey,
};
use order_intake::pipelines::{submit_order, IntakeReceipt};
use order_intake::services::audit::AuditLogger;
use order_intake::services::notify::{NotificationDispatcher, NotificationReport};
use order_intake::services::payment::{CaptureRequest, CaptureStatus, GatewayError, PaymentGateway, PaymentResult};
use order_intake::services::tax::TaxService;
use order_intake::state::{AppState, Collaborators, IntakeServices};
use order_intake::store::{MemoryStore, OrderStore, ReconciliationEntry};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::Level;

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

pub fn dec(raw: &str) -> Decimal {
  raw.parse().unwrap()
}

// --- Catalog ---

pub const TEE: &str = "WF-TS-001";
pub const MUG: &str = "HD-MUG-002";
pub const HOODIE: &str = "WF-HD-003";

pub fn hoodie_key(color: &str, size: &str) -> StockKey {
  StockKey::variant(HOODIE, Some(color.to_string()), Some(size.to_string()))
}

/// Tee at $10.00 (10 in stock), mug at $22.50 (1 in stock), hoodie at
/// $42.00 with a $46.00 Forest/XL variant.
pub fn shop() -> MemoryStore {
  MemoryStore::new()
    .with_item(TEE, "Woodland Fox Tee", dec("10.00"))
    .with_stock(StockKey::item(TEE), 10)
    .with_item(MUG, "Stoneware Mug", dec("22.50"))
    .with_stock(StockKey::item(MUG), 1)
    .with_item(HOODIE, "Woodland Fox Hoodie", dec("42.00"))
    .with_variant(HOODIE, Some("Forest"), Some("M"), None)
    .with_variant(HOODIE, Some("Forest"), Some("XL"), Some(dec("46.00")))
    .with_stock(hoodie_key("Forest", "M"), 3)
    .with_stock(hoodie_key("Forest", "XL"), 1)
}

// --- Requests ---

fn lines(items: &[(&str, i32)]) -> Vec<LineRequest> {
  items
    .iter()
    .map(|(sku, quantity)| LineRequest {
      sku: sku.to_string(),
      quantity: *quantity,
      color: None,
      size: None,
    })
    .collect()
}

pub fn card_order(user: &str, items: &[(&str, i32)], shipping: &str) -> OrderRequest {
  OrderRequest {
    user_id: user.to_string(),
    lines: lines(items),
    payment_method: PaymentMethod::Processor("card".to_string()),
    shipping_method: shipping.to_string(),
    options: CheckoutOptions {
      payment_token: Some("tok_visa".to_string()),
      shipping_address: ShippingAddress {
        name: Some("Robin".to_string()),
        email: Some("robin@example.com".to_string()),
        region: Some("OR".to_string()),
        ..Default::default()
      },
      ..Default::default()
    },
  }
}

pub fn cash_order(user: &str, items: &[(&str, i32)], shipping: &str) -> OrderRequest {
  OrderRequest {
    payment_method: PaymentMethod::Cash,
    options: CheckoutOptions::default(),
    ..card_order(user, items, shipping)
  }
}

// --- Payment gateway double ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureScript {
  Approve,
  Decline,
  Timeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusScript {
  Captured,
  NotFound,
  Unavailable,
}

pub struct ScriptedGateway {
  pub capture: CaptureScript,
  pub status: StatusScript,
  pub refund_fails: bool,
  pub capture_calls: AtomicUsize,
  pub refund_calls: AtomicUsize,
  pub status_calls: AtomicUsize,
  pub refunded: Mutex<Vec<String>>,
}

impl ScriptedGateway {
  pub fn new(capture: CaptureScript) -> Self {
    Self {
      capture,
      status: StatusScript::NotFound,
      refund_fails: false,
      capture_calls: AtomicUsize::new(0),
      refund_calls: AtomicUsize::new(0),
      status_calls: AtomicUsize::new(0),
      refunded: Mutex::new(Vec::new()),
    }
  }

  pub fn approving() -> Self {
    Self::new(CaptureScript::Approve)
  }

  pub fn with_status(mut self, status: StatusScript) -> Self {
    self.status = status;
    self
  }

  pub fn with_failing_refunds(mut self) -> Self {
    self.refund_fails = true;
    self
  }

  pub fn captures(&self) -> usize {
    self.capture_calls.load(Ordering::SeqCst)
  }

  pub fn refunds(&self) -> usize {
    self.refund_calls.load(Ordering::SeqCst)
  }

  pub fn status_checks(&self) -> usize {
    self.status_calls.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
  async fn capture(&self, request: &CaptureRequest) -> std::result::Result<PaymentResult, GatewayError> {
    self.capture_calls.fetch_add(1, Ordering::SeqCst);
    // Let concurrent submissions interleave between capture and write.
    tokio::task::yield_now().await;
    match self.capture {
      CaptureScript::Approve => Ok(PaymentResult {
        transaction_id: format!("txn_{}", request.reference),
        amount: request.amount,
        success: true,
      }),
      CaptureScript::Decline => Err(GatewayError::Declined("card declined".to_string())),
      CaptureScript::Timeout => Err(GatewayError::Timeout("deadline elapsed".to_string())),
    }
  }

  async fn compensate(&self, payment: &PaymentResult) -> std::result::Result<(), GatewayError> {
    self.refund_calls.fetch_add(1, Ordering::SeqCst);
    if self.refund_fails {
      return Err(GatewayError::Unavailable("processor offline".to_string()));
    }
    self.refunded.lock().push(payment.transaction_id.clone());
    Ok(())
  }

  async fn status(&self, reference: &str) -> std::result::Result<CaptureStatus, GatewayError> {
    self.status_calls.fetch_add(1, Ordering::SeqCst);
    match self.status {
      StatusScript::Captured => Ok(CaptureStatus::Captured(PaymentResult {
        transaction_id: format!("txn_late_{}", reference),
        amount: Decimal::ZERO,
        success: true,
      })),
      StatusScript::NotFound => Ok(CaptureStatus::NotFound),
      StatusScript::Unavailable => Err(GatewayError::Unavailable("status endpoint down".to_string())),
    }
  }
}

// --- Other collaborators ---

pub struct FixedTax(pub Decimal);

impl TaxService for FixedTax {
  fn compute_tax(&self, _taxable: Decimal, _address: &ShippingAddress) -> Result<Decimal> {
    Ok(self.0)
  }
}

#[derive(Default)]
pub struct RecordingNotifier {
  pub fail: bool,
  pub notified: Mutex<Vec<String>>,
}

#[async_trait]
impl NotificationDispatcher for RecordingNotifier {
  async fn notify_order_created(&self, order_id: &str) -> Result<NotificationReport> {
    self.notified.lock().push(order_id.to_string());
    if self.fail {
      return Err(AppError::Internal("mail relay unreachable".to_string()));
    }
    Ok(NotificationReport {
      customer_sent: true,
      admin_sent: true,
    })
  }
}

#[derive(Default)]
pub struct RecordingAudit {
  pub fail: bool,
  pub entries: Mutex<Vec<(String, String, String, String)>>,
}

#[async_trait]
impl AuditLogger for RecordingAudit {
  async fn log_order_activity(&self, order_id: &str, event_type: &str, message: &str, actor: &str) -> Result<()> {
    if self.fail {
      return Err(AppError::Internal("audit table locked".to_string()));
    }
    self.entries.lock().push((
      order_id.to_string(),
      event_type.to_string(),
      message.to_string(),
      actor.to_string(),
    ));
    Ok(())
  }
}

/// Delegates to a [`MemoryStore`] with injectable faults.
pub struct FaultyOrderStore {
  pub inner: Arc<MemoryStore>,
  pub fail_writes: bool,
  pub forced_collisions: AtomicUsize,
  pub id_checks: AtomicUsize,
}

impl FaultyOrderStore {
  pub fn new(inner: Arc<MemoryStore>) -> Self {
    Self {
      inner,
      fail_writes: false,
      forced_collisions: AtomicUsize::new(0),
      id_checks: AtomicUsize::new(0),
    }
  }

  pub fn failing_writes(mut self) -> Self {
    self.fail_writes = true;
    self
  }

  /// The next `n` order-id lookups report a collision.
  pub fn colliding(self, n: usize) -> Self {
    self.forced_collisions.store(n, Ordering::SeqCst);
    self
  }
}

#[async_trait]
impl OrderStore for FaultyOrderStore {
  async fn order_id_exists(&self, order_id: &str) -> Result<bool> {
    self.id_checks.fetch_add(1, Ordering::SeqCst);
    let forced = self
      .forced_collisions
      .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
      .is_ok();
    if forced {
      return Ok(true);
    }
    self.inner.order_id_exists(order_id).await
  }

  async fn write_order(&self, order: &NewOrder) -> Result<Order> {
    if self.fail_writes {
      return Err(AppError::Internal("simulated commit failure".to_string()));
    }
    self.inner.write_order(order).await
  }

  async fn find_order(&self, order_id: &str) -> Result<Option<(Order, Vec<OrderLineItem>)>> {
    self.inner.find_order(order_id).await
  }

  async fn find_order_by_idempotency_key(&self, user_id: &str, key: &str) -> Result<Option<Order>> {
    self.inner.find_order_by_idempotency_key(user_id, key).await
  }

  async fn flag_for_reconciliation(&self, entry: &ReconciliationEntry) -> Result<()> {
    self.inner.flag_for_reconciliation(entry).await
  }
}

// --- Harness ---

pub fn test_config() -> AppConfig {
  AppConfig {
    store_backend: StoreBackend::Memory,
    ..AppConfig::default()
  }
}

pub struct Harness {
  pub state: AppState,
  pub store: Arc<MemoryStore>,
  pub gateway: Arc<ScriptedGateway>,
  pub notifier: Arc<RecordingNotifier>,
  pub audit: Arc<RecordingAudit>,
}

pub struct HarnessBuilder {
  store: MemoryStore,
  gateway: ScriptedGateway,
  config: AppConfig,
  tax: Decimal,
  notifier: RecordingNotifier,
  audit: RecordingAudit,
  wrap_orders: Option<Box<dyn FnOnce(Arc<MemoryStore>) -> Arc<dyn OrderStore>>>,
}

impl HarnessBuilder {
  pub fn new(store: MemoryStore) -> Self {
    Self {
      store,
      gateway: ScriptedGateway::approving(),
      config: test_config(),
      tax: dec("1.60"),
      notifier: RecordingNotifier::default(),
      audit: RecordingAudit::default(),
      wrap_orders: None,
    }
  }

  pub fn gateway(mut self, gateway: ScriptedGateway) -> Self {
    self.gateway = gateway;
    self
  }

  pub fn config(mut self, edit: impl FnOnce(&mut AppConfig)) -> Self {
    edit(&mut self.config);
    self
  }

  pub fn tax(mut self, tax: Decimal) -> Self {
    self.tax = tax;
    self
  }

  pub fn failing_notifier(mut self) -> Self {
    self.notifier.fail = true;
    self
  }

  pub fn failing_audit(mut self) -> Self {
    self.audit.fail = true;
    self
  }

  pub fn orders(mut self, wrap: impl FnOnce(Arc<MemoryStore>) -> Arc<dyn OrderStore> + 'static) -> Self {
    self.wrap_orders = Some(Box::new(wrap));
    self
  }

  pub fn build(self) -> Harness {
    setup_tracing();
    let config = Arc::new(self.config);
    let store = Arc::new(self.store);
    let gateway = Arc::new(self.gateway);
    let notifier = Arc::new(self.notifier);
    let audit = Arc::new(self.audit);

    let mut collaborators = Collaborators::from_store(store.clone(), &config)
      .with_payment_gateway(gateway.clone())
      .with_tax(Arc::new(FixedTax(self.tax)))
      .with_notifier(notifier.clone())
      .with_audit(audit.clone());
    if let Some(wrap) = self.wrap_orders {
      collaborators = collaborators.with_orders(wrap(store.clone()));
    }

    let services = Arc::new(IntakeServices::new(config, collaborators));
    Harness {
      state: AppState::new(services),
      store,
      gateway,
      notifier,
      audit,
    }
  }
}

impl Harness {
  pub async fn submit(&self, request: OrderRequest) -> Result<IntakeReceipt> {
    submit_order(&self.state.intake_pipeline, self.state.services.clone(), request).await
  }
}
