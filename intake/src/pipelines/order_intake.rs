// order_intake/src/pipelines/order_intake.rs

//! The order intake pipeline.
//!
//! Validation, pricing and the stock pre-check have no side effects. The
//! payment capture is the first external effect and registers a compensator
//! that refunds it if anything up to and including the order write fails.
//! Audit and notification run after commit and can never fail the order.

use crate::errors::AppError;
use crate::models::{NewOrder, NewOrderLineItem, ShippingMethod};
use crate::pipelines::contexts::OrderIntakeCtx;
use crate::pricing::{audit_client_total, resolve_lines, validate_lines, PricingInput};
use crate::services::payment::CaptureRequest;
use crate::stock_guard;
use crate::store::ReconciliationEntry;
use chrono::{Local, Utc};
use std::sync::Arc;
use stepflow::{ContextData, Pipeline, PipelineControl, SkipCondition};
use tracing::{error, info, warn};

pub const STEP_VERIFY_SCHEMA: &str = "verify_schema";
pub const STEP_REPLAY: &str = "replay_idempotent_submission";
pub const STEP_VALIDATE: &str = "validate_request";
pub const STEP_PRICE: &str = "price_order";
pub const STEP_CHECK_STOCK: &str = "check_stock";
pub const STEP_ASSIGN_ID: &str = "assign_order_id";
pub const STEP_CAPTURE: &str = "capture_payment";
pub const STEP_WRITE: &str = "write_order";
pub const STEP_AUDIT: &str = "record_audit";
pub const STEP_NOTIFY: &str = "notify_customer";

fn missing(what: &str) -> AppError {
  AppError::Internal(format!("order intake reached a step without {}", what))
}

pub fn build_order_intake_pipeline() -> Pipeline<OrderIntakeCtx, AppError> {
  let no_idempotency_key: SkipCondition<OrderIntakeCtx> = Arc::new(|ctx: ContextData<OrderIntakeCtx>| {
    ctx.read().request.options.idempotency_key.is_none()
  });
  // Cash and check settle offline; a fully discounted order has nothing to
  // capture and is committed as paid without a processor transaction.
  let nothing_to_capture: SkipCondition<OrderIntakeCtx> = Arc::new(|ctx: ContextData<OrderIntakeCtx>| {
    let guard = ctx.read();
    let skip = !guard.request.payment_method.requires_capture()
      || guard.pricing.as_ref().is_some_and(|pricing| pricing.total.is_zero());
    skip
  });

  let mut p = Pipeline::<OrderIntakeCtx, AppError>::new(&[
    (STEP_VERIFY_SCHEMA, false, None),
    (STEP_REPLAY, false, Some(no_idempotency_key)),
    (STEP_VALIDATE, false, None),
    (STEP_PRICE, false, None),
    (STEP_CHECK_STOCK, false, None),
    (STEP_ASSIGN_ID, false, None),
    (STEP_CAPTURE, false, Some(nothing_to_capture)),
    (STEP_WRITE, false, None),
    (STEP_AUDIT, true, None),
    (STEP_NOTIFY, true, None),
  ]);

  p.on_root(STEP_VERIFY_SCHEMA, |ctx: ContextData<OrderIntakeCtx>| {
    Box::pin(async move {
      let services = ctx.read().services.clone();
      services.schema_guard.ensure(services.schema_probe.as_ref()).await?;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root(STEP_REPLAY, |ctx: ContextData<OrderIntakeCtx>| {
    Box::pin(async move {
      let (services, user_id, key) = {
        let guard = ctx.read();
        (
          guard.services.clone(),
          guard.request.user_id.clone(),
          guard.request.options.idempotency_key.clone(),
        )
      };
      let Some(key) = key else {
        return Ok::<_, AppError>(PipelineControl::Continue);
      };
      match services.orders.find_order_by_idempotency_key(&user_id, &key).await? {
        Some(order) => {
          info!(order_id = %order.id, idempotency_key = %key, "Resubmitted order; returning the original.");
          ctx.write().replayed_order = Some(order);
          Ok(PipelineControl::Stop)
        }
        None => Ok::<_, AppError>(PipelineControl::Continue),
      }
    })
  });

  p.on_root(STEP_VALIDATE, |ctx: ContextData<OrderIntakeCtx>| {
    Box::pin(async move {
      let guard = ctx.read();
      let request = &guard.request;
      if request.user_id.trim().is_empty() {
        return Err(AppError::Validation("A user identifier is required.".to_string()));
      }
      validate_lines(&request.lines)?;
      if request.shipping_method.trim().is_empty() {
        return Err(AppError::Validation("A shipping method is required.".to_string()));
      }
      if request.payment_method.requires_capture()
        && request.options.payment_token.as_deref().map_or(true, |t| t.trim().is_empty())
      {
        return Err(AppError::Validation(format!(
          "A payment token is required for payment method '{}'.",
          request.payment_method.as_str()
        )));
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root(STEP_PRICE, |ctx: ContextData<OrderIntakeCtx>| {
    Box::pin(async move {
      let (services, request) = {
        let guard = ctx.read();
        (guard.services.clone(), guard.request.clone())
      };

      let mut prices = Vec::with_capacity(request.lines.len());
      for line in &request.lines {
        prices.push(
          services
            .catalog
            .price_for(&line.sku, line.color.as_deref(), line.size.as_deref())
            .await?,
        );
      }
      let resolved = resolve_lines(&request.lines, prices)?;

      let coupon_code = request
        .options
        .coupon_code
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty());
      let coupon = match coupon_code {
        Some(code) => services.coupons.find_coupon(code).await?,
        None => None,
      };

      let breakdown = services.pricing.price(PricingInput {
        lines: &resolved,
        shipping_method: &request.shipping_method,
        address: &request.options.shipping_address,
        coupon_code,
        coupon: coupon.as_ref(),
        now: Utc::now(),
      })?;
      let drift = audit_client_total(
        request.options.client_total,
        breakdown.total,
        services.config.client_total_epsilon,
      );
      info!(
        subtotal = %breakdown.subtotal,
        discount = %breakdown.discount,
        shipping = %breakdown.shipping,
        tax = %breakdown.tax,
        total = %breakdown.total,
        "Order priced."
      );

      ctx.update(|c| {
        c.resolved_lines = resolved;
        c.pricing = Some(breakdown);
        c.client_total_drift = drift;
      });
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root(STEP_CHECK_STOCK, |ctx: ContextData<OrderIntakeCtx>| {
    Box::pin(async move {
      let (services, lines) = {
        let guard = ctx.read();
        (guard.services.clone(), guard.resolved_lines.clone())
      };
      stock_guard::check_availability(services.stock.as_ref(), &lines).await?;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root(STEP_ASSIGN_ID, |ctx: ContextData<OrderIntakeCtx>| {
    Box::pin(async move {
      let (services, user_id, shipping_method) = {
        let guard = ctx.read();
        (
          guard.services.clone(),
          guard.request.user_id.clone(),
          guard.request.shipping_method.clone(),
        )
      };
      let order_id = services
        .order_codes
        .generate(&user_id, Local::now().date_naive(), &shipping_method, services.orders.as_ref())
        .await?;
      info!(%order_id, "Order id assigned.");
      ctx.write().order_id = Some(order_id);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root(STEP_CAPTURE, |ctx: ContextData<OrderIntakeCtx>| {
    Box::pin(async move {
      let (services, request) = {
        let guard = ctx.read();
        let pricing = guard.pricing.as_ref().ok_or_else(|| missing("a price"))?;
        let request = CaptureRequest {
          reference: guard.order_id.clone().ok_or_else(|| missing("an order id"))?,
          amount: pricing.total,
          currency: guard.services.config.currency.clone(),
          token: guard.request.options.payment_token.clone().unwrap_or_default(),
        };
        (guard.services.clone(), request)
      };

      match services.payments.capture(&request).await {
        Ok(payment) => {
          info!(transaction_id = %payment.transaction_id, amount = %payment.amount, "Payment captured.");
          ctx.write().payment = Some(payment);
          Ok::<_, AppError>(PipelineControl::Continue)
        }
        Err(AppError::PaymentUnavailable(reason)) => {
          let entry = ReconciliationEntry {
            order_id: request.reference.clone(),
            payment_id: None,
            amount: request.amount,
            reason: format!("capture outcome unknown: {}", reason),
            created_at: Utc::now(),
          };
          match services.orders.flag_for_reconciliation(&entry).await {
            Ok(()) => ctx.write().reconciliation_flagged = true,
            Err(e) => error!(order_id = %entry.order_id, error = %e, "Could not record payment for reconciliation."),
          }
          Err(AppError::PaymentUnavailable(reason))
        }
        Err(e) => Err(e),
      }
    })
  });

  // Refund a capture whose order never committed. Escalate if the refund fails.
  p.on_compensate(STEP_CAPTURE, |ctx: ContextData<OrderIntakeCtx>| {
    Box::pin(async move {
      let (services, payment, order_id) = {
        let guard = ctx.read();
        if guard.order_committed || guard.refund_issued {
          return Ok(());
        }
        let Some(payment) = guard.payment.clone() else {
          return Ok(());
        };
        (guard.services.clone(), payment, guard.order_id.clone().unwrap_or_default())
      };

      match services.payments.compensate(&payment).await {
        Ok(()) => {
          info!(%order_id, transaction_id = %payment.transaction_id, "Captured payment refunded after failed order write.");
          ctx.write().refund_issued = true;
        }
        Err(refund_err) => {
          error!(
            %order_id,
            transaction_id = %payment.transaction_id,
            amount = %payment.amount,
            error = %refund_err,
            "Refund failed; payment needs manual reconciliation."
          );
          let entry = ReconciliationEntry {
            order_id: order_id.clone(),
            payment_id: Some(payment.transaction_id.clone()),
            amount: payment.amount,
            reason: format!("refund failed: {}", refund_err),
            created_at: Utc::now(),
          };
          services.orders.flag_for_reconciliation(&entry).await?;
          ctx.write().reconciliation_flagged = true;
        }
      }
      Ok::<_, AppError>(())
    })
  });

  p.on_root(STEP_WRITE, |ctx: ContextData<OrderIntakeCtx>| {
    Box::pin(async move {
      let (services, new_order) = {
        let guard = ctx.read();
        let pricing = guard.pricing.as_ref().ok_or_else(|| missing("a price"))?;
        let id = guard.order_id.clone().ok_or_else(|| missing("an order id"))?;
        let request = &guard.request;
        let (status, payment_status) = request.payment_method.initial_statuses();
        let shipping_method = ShippingMethod::parse(&request.shipping_method)
          .map(|m| m.key().to_string())
          .unwrap_or_else(|| request.shipping_method.trim().to_lowercase());
        let lines = guard
          .resolved_lines
          .iter()
          .map(|line| NewOrderLineItem {
            sku: line.sku.clone(),
            item_name: line.name.clone(),
            stock_key: line.stock_key.clone(),
            color: line.color.clone(),
            size: line.size.clone(),
            quantity: line.quantity,
            unit_price: line.unit_price,
          })
          .collect();
        let new_order = NewOrder {
          id,
          user_id: request.user_id.clone(),
          payment_method: request.payment_method.clone(),
          shipping_method,
          status,
          payment_status,
          total_amount: pricing.total,
          shipping_address: request.options.shipping_address.clone(),
          coupon_code: pricing.coupon.applied_code().map(str::to_string),
          payment_id: guard.payment.as_ref().map(|p| p.transaction_id.clone()),
          lines,
          idempotency_key: request.options.idempotency_key.clone(),
          created_at: Utc::now(),
        };
        (guard.services.clone(), new_order)
      };

      let order = services.orders.write_order(&new_order).await?;
      ctx.update(|c| {
        c.order = Some(order);
        c.order_committed = true;
      });
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root(STEP_AUDIT, |ctx: ContextData<OrderIntakeCtx>| {
    Box::pin(async move {
      let (services, order) = {
        let guard = ctx.read();
        (guard.services.clone(), guard.order.clone())
      };
      let Some(order) = order else {
        return Ok(PipelineControl::Continue);
      };
      let message = format!(
        "Order created: total ${}, payment method {}",
        order.total_amount, order.payment_method
      );
      match services
        .audit
        .log_order_activity(&order.id, "order_created", &message, &order.user_id)
        .await
      {
        Ok(()) => ctx.write().audit_logged = true,
        Err(e) => warn!(order_id = %order.id, error = %e, "Audit log entry failed; order unaffected."),
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root(STEP_NOTIFY, |ctx: ContextData<OrderIntakeCtx>| {
    Box::pin(async move {
      let (services, order_id) = {
        let guard = ctx.read();
        (guard.services.clone(), guard.order.as_ref().map(|o| o.id.clone()))
      };
      let Some(order_id) = order_id else {
        return Ok(PipelineControl::Continue);
      };
      match services.notifier.notify_order_created(&order_id).await {
        Ok(report) => {
          info!(%order_id, customer_sent = report.customer_sent, admin_sent = report.admin_sent, "Order notifications dispatched.");
          ctx.write().notification = Some(report);
        }
        Err(e) => warn!(%order_id, error = %e, "Order notification failed; order unaffected."),
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p
}
