// order_intake/src/models/order_item.rs

use crate::models::stock::StockKey;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// A persisted line. `unit_price` is the price captured when the order was
/// placed and is never recomputed.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineItem {
  pub id: Uuid,
  pub order_id: String,
  pub sku: String,
  pub item_name: String,
  pub color: Option<String>,
  pub size: Option<String>,
  pub quantity: i32,
  pub unit_price: Decimal,
}

#[derive(Debug, Clone)]
pub struct NewOrderLineItem {
  pub sku: String,
  pub item_name: String,
  pub stock_key: StockKey,
  pub color: Option<String>,
  pub size: Option<String>,
  pub quantity: i32,
  pub unit_price: Decimal,
}
