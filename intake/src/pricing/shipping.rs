// order_intake/src/pricing/shipping.rs

use crate::errors::{AppError, Result};
use crate::models::{ShippingAddress, ShippingMethod};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Method → cost table with optional per-region overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct ShippingRates {
  rates: HashMap<String, Decimal>,
  overrides: HashMap<(String, String), Decimal>,
  baseline: Decimal,
}

fn method_key(raw: &str) -> String {
  ShippingMethod::parse(raw)
    .map(|m| m.key().to_string())
    .unwrap_or_else(|| raw.trim().to_lowercase())
}

impl ShippingRates {
  /// Pickup free, local delivery and USPS $5, UPS $8.50, FedEx $12, baseline $5.
  pub fn standard() -> Self {
    let rates = [
      (ShippingMethod::Pickup, Decimal::ZERO),
      (ShippingMethod::LocalDelivery, Decimal::new(5, 0)),
      (ShippingMethod::Usps, Decimal::new(5, 0)),
      (ShippingMethod::Ups, Decimal::new(850, 2)),
      (ShippingMethod::Fedex, Decimal::new(12, 0)),
    ]
    .into_iter()
    .map(|(method, cost)| (method.key().to_string(), cost))
    .collect();
    Self {
      rates,
      overrides: HashMap::new(),
      baseline: Decimal::new(5, 0),
    }
  }

  /// Builds the table from `method=cost` and `method@region=cost` entries.
  pub fn from_table(entries: &[(String, Decimal)], baseline: Decimal) -> Result<Self> {
    let mut rates = HashMap::new();
    let mut overrides = HashMap::new();
    for (key, cost) in entries {
      if cost.is_sign_negative() {
        return Err(AppError::Config(format!("Shipping cost for '{}' must not be negative", key)));
      }
      match key.split_once('@') {
        Some((method, region)) => {
          overrides.insert((method_key(method), region.trim().to_lowercase()), *cost);
        }
        None => {
          rates.insert(method_key(key), *cost);
        }
      }
    }
    Ok(Self {
      rates,
      overrides,
      baseline,
    })
  }

  pub fn with_baseline(mut self, baseline: Decimal) -> Self {
    self.baseline = baseline;
    self
  }

  pub fn with_rate(mut self, method: &str, cost: Decimal) -> Self {
    self.rates.insert(method_key(method), cost);
    self
  }

  pub fn with_region_rate(mut self, method: &str, region: &str, cost: Decimal) -> Self {
    self.overrides.insert((method_key(method), region.trim().to_lowercase()), cost);
    self
  }

  pub fn baseline(&self) -> Decimal {
    self.baseline
  }

  /// Cost for `method` shipped to `address`. Unknown methods cost the baseline.
  pub fn cost(&self, method: &str, address: &ShippingAddress) -> Decimal {
    let key = method_key(method);
    let regional = address
      .region
      .as_deref()
      .map(|region| (key.clone(), region.trim().to_lowercase()))
      .and_then(|k| self.overrides.get(&k));
    match regional.or_else(|| self.rates.get(&key)) {
      Some(cost) => *cost,
      None => {
        tracing::debug!(shipping_method = %method, baseline = %self.baseline, "Unknown shipping method, using baseline cost.");
        self.baseline
      }
    }
  }
}
