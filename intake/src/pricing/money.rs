// order_intake/src/pricing/money.rs

//! Money helpers. All amounts are `Decimal` with two places, rounded half
//! away from zero.

use crate::errors::{AppError, Result};
use rust_decimal::prelude::*;

const DECIMAL_PLACES: u32 = 2;

/// Largest quantity accepted on one line.
pub const MAX_QUANTITY: i32 = 9999;

pub fn round_money(amount: Decimal) -> Decimal {
  amount.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Amount in minor units (cents) as the processor expects it.
pub fn to_minor_units(amount: Decimal) -> Result<i64> {
  (round_money(amount) * Decimal::ONE_HUNDRED)
    .to_i64()
    .ok_or_else(|| AppError::Validation(format!("Amount {} is out of range", amount)))
}

pub fn from_minor_units(minor: i64) -> Decimal {
  Decimal::new(minor, DECIMAL_PLACES)
}
