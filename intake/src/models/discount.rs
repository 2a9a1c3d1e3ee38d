// order_intake/src/models/discount.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, Type as SqlxType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, SqlxType)]
#[sqlx(type_name = "discount_kind_enum", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DiscountKind {
  Percent,
  Fixed,
}

/// A coupon as stored. Read-only to order intake, apart from the usage count
/// bumped when an order using it commits.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct DiscountCode {
  pub code: String,
  pub kind: DiscountKind,
  pub value: Decimal,
  pub active: bool,
  pub starts_at: Option<DateTime<Utc>>,
  pub ends_at: Option<DateTime<Utc>>,
  pub usage_limit: Option<i32>,
  pub times_used: i32,
  pub min_order_amount: Option<Decimal>,
}
