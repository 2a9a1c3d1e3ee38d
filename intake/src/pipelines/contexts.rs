// order_intake/src/pipelines/contexts.rs

//! Data the order intake pipeline threads through its steps. Handlers
//! receive it wrapped in `stepflow::ContextData`.

use crate::models::{Order, OrderRequest, ResolvedLine};
use crate::pricing::PricingBreakdown;
use crate::services::notify::NotificationReport;
use crate::services::payment::PaymentResult;
use crate::state::IntakeServices;
use std::sync::Arc;

pub struct OrderIntakeCtx {
  pub services: Arc<IntakeServices>,
  pub request: OrderRequest,

  /// Set when a live idempotency key already produced an order.
  pub replayed_order: Option<Order>,

  pub resolved_lines: Vec<ResolvedLine>,
  pub pricing: Option<PricingBreakdown>,
  pub client_total_drift: bool,

  pub order_id: Option<String>,
  pub payment: Option<PaymentResult>,

  pub order: Option<Order>,
  pub order_committed: bool,

  // Compensation bookkeeping.
  pub refund_issued: bool,
  pub reconciliation_flagged: bool,

  pub audit_logged: bool,
  pub notification: Option<NotificationReport>,
}

impl OrderIntakeCtx {
  pub fn new(services: Arc<IntakeServices>, request: OrderRequest) -> Self {
    Self {
      services,
      request,
      replayed_order: None,
      resolved_lines: Vec::new(),
      pricing: None,
      client_total_drift: false,
      order_id: None,
      payment: None,
      order: None,
      order_committed: false,
      refund_issued: false,
      reconciliation_flagged: false,
      audit_logged: false,
      notification: None,
    }
  }
}
