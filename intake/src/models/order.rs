// order_intake/src/models/order.rs

use crate::models::order_item::NewOrderLineItem;
use crate::models::request::ShippingAddress;
use crate::models::stock::StockKey;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{FromRow, Type as SqlxType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "order_status_enum", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
  Pending,
  Processing,
  Shipped,
  Delivered,
  Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "payment_status_enum", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
  Pending,
  Received,
  Refunded,
  Failed,
}

/// How the buyer pays.
///
/// Cash and check settle out of band; anything else is captured through the
/// payment processor before the order is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentMethod {
  Cash,
  Check,
  Processor(String),
}

impl PaymentMethod {
  pub fn parse(raw: &str) -> Option<Self> {
    let normalized = raw.trim().to_lowercase();
    match normalized.as_str() {
      "" => None,
      "cash" => Some(PaymentMethod::Cash),
      "check" | "cheque" => Some(PaymentMethod::Check),
      _ => Some(PaymentMethod::Processor(normalized)),
    }
  }

  pub fn as_str(&self) -> &str {
    match self {
      PaymentMethod::Cash => "cash",
      PaymentMethod::Check => "check",
      PaymentMethod::Processor(name) => name,
    }
  }

  pub fn requires_capture(&self) -> bool {
    matches!(self, PaymentMethod::Processor(_))
  }

  /// Status pair an order starts with when it is committed.
  pub fn initial_statuses(&self) -> (OrderStatus, PaymentStatus) {
    if self.requires_capture() {
      (OrderStatus::Processing, PaymentStatus::Received)
    } else {
      (OrderStatus::Pending, PaymentStatus::Pending)
    }
  }
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Order {
  pub id: String,
  pub user_id: String,
  pub payment_method: String,
  pub shipping_method: String,
  pub status: OrderStatus,
  pub payment_status: PaymentStatus,
  pub total_amount: Decimal,
  pub shipping_address: Json<ShippingAddress>,
  pub coupon_code: Option<String>,
  /// Processor transaction id; set only for captured payments.
  pub payment_id: Option<String>,
  pub created_at: DateTime<Utc>,
}

/// Everything the order write commits in one transaction.
#[derive(Debug, Clone)]
pub struct NewOrder {
  pub id: String,
  pub user_id: String,
  pub payment_method: PaymentMethod,
  pub shipping_method: String,
  pub status: OrderStatus,
  pub payment_status: PaymentStatus,
  pub total_amount: Decimal,
  pub shipping_address: ShippingAddress,
  pub coupon_code: Option<String>,
  pub payment_id: Option<String>,
  pub lines: Vec<NewOrderLineItem>,
  pub idempotency_key: Option<String>,
  pub created_at: DateTime<Utc>,
}

impl NewOrder {
  /// Quantity to take from each stock row, with repeated keys merged.
  pub fn stock_decrements(&self) -> Vec<(StockKey, i32, String)> {
    let mut merged: Vec<(StockKey, i32, String)> = Vec::new();
    for line in &self.lines {
      match merged.iter_mut().find(|(key, _, _)| *key == line.stock_key) {
        Some(entry) => entry.1 += line.quantity,
        None => merged.push((line.stock_key.clone(), line.quantity, line.item_name.clone())),
      }
    }
    merged
  }
}
