// order_intake/src/services/tax.rs

use crate::errors::Result;
use crate::models::ShippingAddress;
use crate::pricing::money::round_money;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Jurisdiction-aware tax lookup. Synchronous and pure given its inputs.
pub trait TaxService: Send + Sync {
  fn compute_tax(&self, taxable: Decimal, address: &ShippingAddress) -> Result<Decimal>;
}

/// Flat rate per region (state/province), with a default for everything else.
#[derive(Debug, Clone, Default)]
pub struct RateTableTax {
  rates: HashMap<String, Decimal>,
  default_rate: Decimal,
}

impl RateTableTax {
  /// `rates` keys are region codes, compared case-insensitively. Rates are
  /// fractions (0.0725 for 7.25%).
  pub fn new(rates: HashMap<String, Decimal>, default_rate: Decimal) -> Self {
    let rates = rates.into_iter().map(|(k, v)| (k.trim().to_lowercase(), v)).collect();
    Self { rates, default_rate }
  }

  fn rate_for(&self, address: &ShippingAddress) -> Decimal {
    address
      .region
      .as_deref()
      .and_then(|region| self.rates.get(&region.trim().to_lowercase()))
      .copied()
      .unwrap_or(self.default_rate)
  }
}

impl TaxService for RateTableTax {
  fn compute_tax(&self, taxable: Decimal, address: &ShippingAddress) -> Result<Decimal> {
    if taxable <= Decimal::ZERO {
      return Ok(Decimal::ZERO);
    }
    Ok(round_money(taxable * self.rate_for(address)))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn uses_region_rate_then_default() {
    let tax = RateTableTax::new(
      HashMap::from([("CA".to_string(), Decimal::new(725, 4))]),
      Decimal::new(5, 2),
    );
    let ca = ShippingAddress {
      region: Some("ca".to_string()),
      ..Default::default()
    };
    assert_eq!(tax.compute_tax(Decimal::new(100, 0), &ca).unwrap(), Decimal::new(725, 2));
    assert_eq!(
      tax.compute_tax(Decimal::new(100, 0), &ShippingAddress::default()).unwrap(),
      Decimal::new(5, 0)
    );
  }

  #[test]
  fn nothing_taxable_means_no_tax() {
    let tax = RateTableTax::new(HashMap::new(), Decimal::new(1, 1));
    assert_eq!(tax.compute_tax(Decimal::ZERO, &ShippingAddress::default()).unwrap(), Decimal::ZERO);
  }
}
