// order_intake/src/pipelines/mod.rs

//! Order intake as a `stepflow` pipeline, plus the entry point that runs it.

pub mod contexts;
pub mod order_intake;

use crate::errors::{AppError, Result};
use crate::models::{Order, OrderRequest};
use crate::pricing::PricingBreakdown;
use crate::services::notify::NotificationReport;
use crate::state::IntakeServices;
use contexts::OrderIntakeCtx;
use std::sync::Arc;
use stepflow::{ContextData, Pipeline};
use tracing::instrument;

/// What a finished submission produced.
#[derive(Debug, Clone)]
pub struct IntakeReceipt {
  pub order: Order,
  /// Absent for replays; the original pricing is not re-derived.
  pub pricing: Option<PricingBreakdown>,
  pub replayed: bool,
  pub audit_logged: bool,
  pub notification: Option<NotificationReport>,
}

/// Runs one order submission through `pipeline`.
#[instrument(
  name = "submit_order",
  skip_all,
  fields(user_id = %request.user_id, lines = request.lines.len(), payment_method = request.payment_method.as_str())
)]
pub async fn submit_order(
  pipeline: &Pipeline<OrderIntakeCtx, AppError>,
  services: Arc<IntakeServices>,
  request: OrderRequest,
) -> Result<IntakeReceipt> {
  let ctx = ContextData::new(OrderIntakeCtx::new(services, request));
  pipeline.run(ctx.clone()).await?;

  let mut guard = ctx.write();
  if let Some(order) = guard.replayed_order.take() {
    return Ok(IntakeReceipt {
      order,
      pricing: None,
      replayed: true,
      audit_logged: false,
      notification: None,
    });
  }
  let order = guard
    .order
    .take()
    .ok_or_else(|| AppError::Internal("Order pipeline finished without writing an order".to_string()))?;
  Ok(IntakeReceipt {
    order,
    pricing: guard.pricing.take(),
    replayed: false,
    audit_logged: guard.audit_logged,
    notification: guard.notification,
  })
}
