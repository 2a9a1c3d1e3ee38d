// order_intake/src/pricing/coupon.rs

//! Coupon validation. A coupon that fails any rule is ignored, never fatal.

use crate::models::{DiscountCode, DiscountKind};
use crate::pricing::money::round_money;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CouponRejection {
  NotFound,
  Inactive,
  NotStarted,
  Expired,
  UsageExhausted,
  BelowMinimum,
}

/// What happened to the coupon the buyer entered.
///
/// Serialized as one shape for every outcome:
/// `{code, status: "none"|"applied"|"ignored", reason?, discount}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(into = "CouponView")]
pub enum CouponOutcome {
  None,
  Applied { code: String, discount: Decimal },
  Ignored { code: String, reason: CouponRejection },
}

#[derive(Serialize)]
struct CouponView {
  code: Option<String>,
  status: &'static str,
  #[serde(skip_serializing_if = "Option::is_none")]
  reason: Option<CouponRejection>,
  discount: Decimal,
}

impl From<CouponOutcome> for CouponView {
  fn from(outcome: CouponOutcome) -> Self {
    match outcome {
      CouponOutcome::None => CouponView {
        code: None,
        status: "none",
        reason: None,
        discount: Decimal::ZERO,
      },
      CouponOutcome::Applied { code, discount } => CouponView {
        code: Some(code),
        status: "applied",
        reason: None,
        discount,
      },
      CouponOutcome::Ignored { code, reason } => CouponView {
        code: Some(code),
        status: "ignored",
        reason: Some(reason),
        discount: Decimal::ZERO,
      },
    }
  }
}

impl CouponOutcome {
  pub fn discount(&self) -> Decimal {
    match self {
      CouponOutcome::Applied { discount, .. } => *discount,
      _ => Decimal::ZERO,
    }
  }

  /// Code to persist on the order; only applied coupons are recorded.
  pub fn applied_code(&self) -> Option<&str> {
    match self {
      CouponOutcome::Applied { code, .. } => Some(code),
      _ => None,
    }
  }

  pub fn is_ignored(&self) -> bool {
    matches!(self, CouponOutcome::Ignored { .. })
  }
}

fn check(coupon: &DiscountCode, subtotal: Decimal, now: DateTime<Utc>) -> Result<(), CouponRejection> {
  if !coupon.active {
    return Err(CouponRejection::Inactive);
  }
  if coupon.starts_at.is_some_and(|starts| starts > now) {
    return Err(CouponRejection::NotStarted);
  }
  if coupon.ends_at.is_some_and(|ends| ends < now) {
    return Err(CouponRejection::Expired);
  }
  if coupon.usage_limit.is_some_and(|limit| coupon.times_used >= limit) {
    return Err(CouponRejection::UsageExhausted);
  }
  if coupon.min_order_amount.is_some_and(|min| subtotal < min) {
    return Err(CouponRejection::BelowMinimum);
  }
  Ok(())
}

/// Discount a valid coupon grants on `subtotal`, never more than the subtotal.
pub fn discount_amount(coupon: &DiscountCode, subtotal: Decimal) -> Decimal {
  let raw = match coupon.kind {
    DiscountKind::Percent => round_money(subtotal * coupon.value / Decimal::ONE_HUNDRED),
    DiscountKind::Fixed => round_money(coupon.value),
  };
  raw.max(Decimal::ZERO).min(subtotal)
}

/// Applies `entered` against the looked-up `coupon` (None when no such code).
pub fn evaluate(
  entered: Option<&str>,
  coupon: Option<&DiscountCode>,
  subtotal: Decimal,
  now: DateTime<Utc>,
) -> CouponOutcome {
  let Some(code) = entered.map(str::trim).filter(|c| !c.is_empty()) else {
    return CouponOutcome::None;
  };
  let Some(coupon) = coupon else {
    return CouponOutcome::Ignored {
      code: code.to_string(),
      reason: CouponRejection::NotFound,
    };
  };
  match check(coupon, subtotal, now) {
    Ok(()) => CouponOutcome::Applied {
      code: coupon.code.clone(),
      discount: discount_amount(coupon, subtotal),
    },
    Err(reason) => CouponOutcome::Ignored {
      code: code.to_string(),
      reason,
    },
  }
}
