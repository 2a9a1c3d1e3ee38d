// order_intake/src/models/request.rs

//! Validated order submission, independent of the HTTP payload shape.

use crate::models::order::PaymentMethod;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShippingAddress {
  pub name: Option<String>,
  pub email: Option<String>,
  pub phone: Option<String>,
  pub line1: Option<String>,
  pub line2: Option<String>,
  pub city: Option<String>,
  /// State or province; drives tax and regional shipping rates.
  pub region: Option<String>,
  pub postal_code: Option<String>,
  pub country: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineRequest {
  pub sku: String,
  pub quantity: i32,
  pub color: Option<String>,
  pub size: Option<String>,
}

/// Optional parts of a submission.
///
/// Defaults: empty address (store pickup), no coupon, no client total, no
/// payment token, no idempotency key, breakdown not echoed.
#[derive(Debug, Clone, Default)]
pub struct CheckoutOptions {
  pub shipping_address: ShippingAddress,
  pub coupon_code: Option<String>,
  /// Total the client computed. Compared for diagnostics only.
  pub client_total: Option<Decimal>,
  /// Opaque processor token; required for processor-backed methods.
  pub payment_token: Option<String>,
  pub idempotency_key: Option<String>,
  pub debug: bool,
}

#[derive(Debug, Clone)]
pub struct OrderRequest {
  pub user_id: String,
  pub lines: Vec<LineRequest>,
  pub payment_method: PaymentMethod,
  pub shipping_method: String,
  pub options: CheckoutOptions,
}
