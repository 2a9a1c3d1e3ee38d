// order_intake/src/web/handlers/orders.rs

use actix_web::{web, HttpRequest, HttpResponse};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::errors::{AppError, Result};
use crate::models::{
  CheckoutOptions, LineRequest, OrderRequest, OrderStatus, PaymentMethod, PaymentStatus, ShippingAddress,
};
use crate::pipelines::submit_order;
use crate::pricing::coupon::CouponOutcome;
use crate::pricing::PricingBreakdown;
use crate::state::AppState;
use crate::web::extractors::{idempotency_key_header, AuthenticatedUser};

// --- Request DTOs ---

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct LineItemPayload {
  pub sku: String,
  pub quantity: i32,
  pub color: Option<String>,
  pub size: Option<String>,
}

/// Order submission body. Lines come either as `items` or as the legacy
/// parallel arrays `skus`/`quantities`/`colors`/`sizes`.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct PlaceOrderPayload {
  pub items: Option<Vec<LineItemPayload>>,
  pub skus: Option<Vec<String>>,
  pub quantities: Option<Vec<i32>>,
  pub colors: Option<Vec<Option<String>>>,
  pub sizes: Option<Vec<Option<String>>>,
  pub payment_method: String,
  pub shipping_method: String,
  pub shipping_address: Option<ShippingAddress>,
  pub coupon_code: Option<String>,
  pub client_total: Option<Decimal>,
  pub payment_token: Option<String>,
  pub idempotency_key: Option<String>,
  pub debug: bool,
}

#[derive(Deserialize, Debug, Default)]
pub struct DebugQuery {
  pub debug: Option<bool>,
}

fn blank_to_none(value: Option<String>) -> Option<String> {
  value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parallel_lines(
  skus: Vec<String>,
  quantities: Option<Vec<i32>>,
  colors: Option<Vec<Option<String>>>,
  sizes: Option<Vec<Option<String>>>,
) -> Result<Vec<LineRequest>> {
  let quantities = quantities.unwrap_or_default();
  if quantities.len() != skus.len() {
    return Err(AppError::Validation(format!(
      "Got {} SKUs but {} quantities.",
      skus.len(),
      quantities.len()
    )));
  }
  let colors = colors.unwrap_or_else(|| vec![None; skus.len()]);
  let sizes = sizes.unwrap_or_else(|| vec![None; skus.len()]);
  if colors.len() != skus.len() || sizes.len() != skus.len() {
    return Err(AppError::Validation(format!(
      "Got {} SKUs but {} colors and {} sizes.",
      skus.len(),
      colors.len(),
      sizes.len()
    )));
  }
  Ok(
    skus
      .into_iter()
      .zip(quantities)
      .zip(colors.into_iter().zip(sizes))
      .map(|((sku, quantity), (color, size))| LineRequest {
        sku: sku.trim().to_string(),
        quantity,
        color: blank_to_none(color),
        size: blank_to_none(size),
      })
      .collect(),
  )
}

impl PlaceOrderPayload {
  /// Normalizes the payload into an [`OrderRequest`] for `user_id`.
  pub fn into_request(self, user_id: String, header_key: Option<String>, debug_query: bool) -> Result<OrderRequest> {
    let lines = match (self.items, self.skus) {
      (Some(_), Some(_)) => {
        return Err(AppError::Validation(
          "Send line items either as 'items' or as 'skus'/'quantities', not both.".to_string(),
        ))
      }
      (Some(items), None) => items
        .into_iter()
        .map(|item| LineRequest {
          sku: item.sku.trim().to_string(),
          quantity: item.quantity,
          color: blank_to_none(item.color),
          size: blank_to_none(item.size),
        })
        .collect(),
      (None, Some(skus)) => parallel_lines(skus, self.quantities, self.colors, self.sizes)?,
      (None, None) => Vec::new(),
    };

    let payment_method = PaymentMethod::parse(&self.payment_method)
      .ok_or_else(|| AppError::Validation("A payment method is required.".to_string()))?;

    Ok(OrderRequest {
      user_id,
      lines,
      payment_method,
      shipping_method: self.shipping_method.trim().to_string(),
      options: CheckoutOptions {
        shipping_address: self.shipping_address.unwrap_or_default(),
        coupon_code: blank_to_none(self.coupon_code),
        client_total: self.client_total,
        payment_token: blank_to_none(self.payment_token),
        idempotency_key: blank_to_none(self.idempotency_key).or(header_key),
        debug: self.debug || debug_query,
      },
    })
  }
}

// --- Response DTO ---

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderResponse {
  pub order_id: String,
  pub status: OrderStatus,
  pub payment_status: PaymentStatus,
  pub total: Decimal,
  pub coupon: Option<CouponOutcome>,
  pub replayed: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub pricing: Option<PricingBreakdown>,
}

// --- Handlers ---

#[instrument(
  name = "handler::place_order",
  skip(app_state, req, payload, query, auth_user),
  fields(user_id = %auth_user.user_id)
)]
pub async fn place_order_handler(
  app_state: web::Data<AppState>,
  req: HttpRequest,
  payload: web::Json<PlaceOrderPayload>,
  query: web::Query<DebugQuery>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse> {
  let request = payload.into_inner().into_request(
    auth_user.user_id.clone(),
    idempotency_key_header(&req),
    query.debug.unwrap_or(false),
  )?;
  let debug = request.options.debug;

  let receipt = match submit_order(&app_state.intake_pipeline, app_state.services.clone(), request).await {
    Ok(receipt) => receipt,
    Err(app_err) => {
      warn!(user_id = %auth_user.user_id, category = app_err.category().as_str(), error = %app_err, "Order rejected.");
      return Err(app_err);
    }
  };

  info!(
    order_id = %receipt.order.id,
    total = %receipt.order.total_amount,
    replayed = receipt.replayed,
    "Order accepted."
  );

  let response = PlaceOrderResponse {
    order_id: receipt.order.id.clone(),
    status: receipt.order.status,
    payment_status: receipt.order.payment_status,
    total: receipt.order.total_amount,
    coupon: receipt.pricing.as_ref().map(|p| p.coupon.clone()),
    replayed: receipt.replayed,
    pricing: if debug { receipt.pricing } else { None },
  };
  if receipt.replayed {
    Ok(HttpResponse::Ok().json(response))
  } else {
    Ok(HttpResponse::Created().json(response))
  }
}

#[instrument(name = "handler::get_order", skip(app_state))]
pub async fn get_order_handler(app_state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse> {
  let order_id = path.into_inner();
  let (order, lines) = app_state
    .services
    .orders
    .find_order(&order_id)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Order {} not found", order_id)))?;
  Ok(HttpResponse::Ok().json(json!({
    "order": order,
    "lineItems": lines,
  })))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parallel_arrays_must_line_up() {
    let payload = PlaceOrderPayload {
      skus: Some(vec!["A".into(), "B".into()]),
      quantities: Some(vec![1]),
      payment_method: "cash".into(),
      shipping_method: "pickup".into(),
      ..Default::default()
    };
    let err = payload.into_request("U1".into(), None, false).unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
  }

  #[test]
  fn parallel_arrays_become_lines() {
    let payload = PlaceOrderPayload {
      skus: Some(vec!["A".into(), "B".into()]),
      quantities: Some(vec![1, 3]),
      colors: Some(vec![Some("red".into()), Some(" ".into())]),
      payment_method: "card".into(),
      shipping_method: "usps".into(),
      ..Default::default()
    };
    let request = payload.into_request("U1".into(), Some("key-1".into()), true).unwrap();
    assert_eq!(request.lines.len(), 2);
    assert_eq!(request.lines[0].color.as_deref(), Some("red"));
    assert_eq!(request.lines[1].color, None);
    assert_eq!(request.lines[1].quantity, 3);
    assert_eq!(request.options.idempotency_key.as_deref(), Some("key-1"));
    assert!(request.options.debug);
  }

  #[test]
  fn body_key_wins_over_header() {
    let payload = PlaceOrderPayload {
      items: Some(vec![LineItemPayload {
        sku: "A".into(),
        quantity: 1,
        ..Default::default()
      }]),
      payment_method: "cash".into(),
      shipping_method: "pickup".into(),
      idempotency_key: Some("body".into()),
      ..Default::default()
    };
    let request = payload.into_request("U1".into(), Some("header".into()), false).unwrap();
    assert_eq!(request.options.idempotency_key.as_deref(), Some("body"));
  }
}
