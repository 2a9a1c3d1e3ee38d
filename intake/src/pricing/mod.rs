// order_intake/src/pricing/mod.rs

//! Authoritative server-side pricing.
//!
//! The engine is pure given the catalog prices, the coupon snapshot and the
//! tax service: it never touches orders or stock.

pub mod coupon;
pub mod money;
pub mod shipping;

use crate::errors::{AppError, Result};
use crate::models::{CatalogPrice, DiscountCode, LineRequest, ResolvedLine, ShippingAddress, StockKey};
use crate::services::tax::TaxService;
use chrono::{DateTime, Utc};
use coupon::CouponOutcome;
use money::{round_money, MAX_QUANTITY};
use rust_decimal::Decimal;
use serde::Serialize;
use shipping::ShippingRates;
use std::sync::Arc;

/// What tax is charged on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxBase {
  /// Subtotal minus discount. Shipping is not taxed.
  Merchandise,
  /// Subtotal minus discount, plus shipping.
  MerchandiseAndShipping,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingBreakdown {
  pub subtotal: Decimal,
  pub shipping: Decimal,
  pub tax: Decimal,
  pub discount: Decimal,
  pub total: Decimal,
  pub coupon: CouponOutcome,
  pub tax_base: TaxBase,
}

pub struct PricingInput<'a> {
  pub lines: &'a [ResolvedLine],
  pub shipping_method: &'a str,
  pub address: &'a ShippingAddress,
  pub coupon_code: Option<&'a str>,
  /// Coupon looked up for `coupon_code`, if one exists.
  pub coupon: Option<&'a DiscountCode>,
  pub now: DateTime<Utc>,
}

#[derive(Clone)]
pub struct PricingEngine {
  shipping: ShippingRates,
  tax_base: TaxBase,
  tax: Arc<dyn TaxService>,
}

impl PricingEngine {
  pub fn new(shipping: ShippingRates, tax_base: TaxBase, tax: Arc<dyn TaxService>) -> Self {
    Self { shipping, tax_base, tax }
  }

  pub fn price(&self, input: PricingInput<'_>) -> Result<PricingBreakdown> {
    if input.lines.is_empty() {
      return Err(AppError::Validation("An order needs at least one item.".to_string()));
    }

    let subtotal = round_money(
      input
        .lines
        .iter()
        .map(|line| line.unit_price * Decimal::from(line.quantity))
        .sum(),
    );

    let coupon = coupon::evaluate(input.coupon_code, input.coupon, subtotal, input.now);
    if let CouponOutcome::Ignored { code, reason } = &coupon {
      tracing::warn!(coupon_code = %code, ?reason, "Coupon ignored; pricing without discount.");
    }
    let discount = coupon.discount();

    let shipping = round_money(self.shipping.cost(input.shipping_method, input.address));

    let taxable = match self.tax_base {
      TaxBase::Merchandise => subtotal - discount,
      TaxBase::MerchandiseAndShipping => subtotal - discount + shipping,
    };
    let tax = round_money(self.tax.compute_tax(taxable, input.address)?);
    if tax.is_sign_negative() {
      return Err(AppError::Internal(format!("Tax service returned a negative amount: {}", tax)));
    }

    let total = round_money(subtotal - discount + shipping + tax);

    Ok(PricingBreakdown {
      subtotal,
      shipping,
      tax,
      discount,
      total,
      coupon,
      tax_base: self.tax_base,
    })
  }
}

/// Validates the requested lines before any lookup.
pub fn validate_lines(lines: &[LineRequest]) -> Result<()> {
  if lines.is_empty() {
    return Err(AppError::Validation("An order needs at least one item.".to_string()));
  }
  for line in lines {
    if line.sku.trim().is_empty() {
      return Err(AppError::Validation("Every item needs a SKU.".to_string()));
    }
    if line.quantity < 1 || line.quantity > MAX_QUANTITY {
      return Err(AppError::Validation(format!(
        "Quantity for {} must be between 1 and {}, got {}.",
        line.sku, MAX_QUANTITY, line.quantity
      )));
    }
  }
  Ok(())
}

/// Joins requested lines with their catalog prices (same order). An unknown
/// SKU is a validation error, never a zero-priced line.
pub fn resolve_lines(requested: &[LineRequest], prices: Vec<Option<CatalogPrice>>) -> Result<Vec<ResolvedLine>> {
  if requested.len() != prices.len() {
    return Err(AppError::Internal(format!(
      "Catalog returned {} prices for {} lines",
      prices.len(),
      requested.len()
    )));
  }
  requested
    .iter()
    .zip(prices)
    .map(|(line, price)| {
      let price = price.ok_or_else(|| AppError::Validation(format!("Unknown SKU: {}", line.sku)))?;
      let stock_key = if price.has_variants {
        StockKey::variant(price.sku.clone(), line.color.clone(), line.size.clone())
      } else {
        StockKey::item(price.sku.clone())
      };
      Ok(ResolvedLine {
        sku: price.sku,
        name: price.name,
        color: line.color.clone(),
        size: line.size.clone(),
        quantity: line.quantity,
        unit_price: price.unit_price,
        stock_key,
      })
    })
    .collect()
}

/// Logs a client total that drifts from the server total by more than
/// `epsilon`. Returns whether it drifted.
pub fn audit_client_total(client_total: Option<Decimal>, server_total: Decimal, epsilon: Decimal) -> bool {
  let Some(client_total) = client_total else {
    return false;
  };
  let drift = (client_total - server_total).abs();
  if drift > epsilon {
    tracing::warn!(
      %client_total,
      %server_total,
      %drift,
      "Client-submitted total differs from server total; server total is used."
    );
    return true;
  }
  false
}
