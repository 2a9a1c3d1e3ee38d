// order_intake/src/store/mod.rs

//! Durable state behind narrow traits.
//!
//! Postgres is the production backend. The in-memory backend serves demos
//! and tests and upholds the same write contract: an order and all its
//! stock decrements land together or not at all.

pub mod memory;
pub mod postgres;
pub mod schema;

use crate::errors::Result;
use crate::models::{CatalogPrice, DiscountCode, NewOrder, Order, OrderLineItem, StockKey};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use schema::SchemaGuard;

#[async_trait]
pub trait CatalogStore: Send + Sync {
  /// Price of `sku` for the exact (color, size) variant, falling back to the
  /// item's base price. `None` when the SKU is unknown.
  async fn price_for(&self, sku: &str, color: Option<&str>, size: Option<&str>) -> Result<Option<CatalogPrice>>;
}

#[async_trait]
pub trait CouponStore: Send + Sync {
  /// Case-insensitive lookup.
  async fn find_coupon(&self, code: &str) -> Result<Option<DiscountCode>>;
}

#[async_trait]
pub trait StockLedger: Send + Sync {
  /// Current quantity of a stock row, `None` if the row does not exist.
  async fn available(&self, key: &StockKey) -> Result<Option<i32>>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
  async fn order_id_exists(&self, order_id: &str) -> Result<bool>;

  /// Commits the order, its stock decrements, line items, coupon usage and
  /// idempotency key in one transaction.
  ///
  /// Fails with `InsufficientStock` when any conditional decrement matches
  /// no row, and with `DuplicateSubmission` when the same user already holds
  /// a live idempotency key. Either way nothing is written.
  async fn write_order(&self, order: &NewOrder) -> Result<Order>;

  async fn find_order(&self, order_id: &str) -> Result<Option<(Order, Vec<OrderLineItem>)>>;

  /// Order `user_id` created under `key`, if the key is still live. Keys
  /// are scoped per user.
  async fn find_order_by_idempotency_key(&self, user_id: &str, key: &str) -> Result<Option<Order>>;

  async fn flag_for_reconciliation(&self, entry: &ReconciliationEntry) -> Result<()>;
}

#[async_trait]
pub trait SchemaProbe: Send + Sync {
  /// `table.column` pairs the pipeline needs that do not exist.
  async fn missing_schema(&self) -> Result<Vec<String>>;
}

/// A captured payment that could not be refunded automatically, or whose
/// outcome is unknown.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationEntry {
  pub order_id: String,
  pub payment_id: Option<String>,
  pub amount: Decimal,
  pub reason: String,
  pub created_at: DateTime<Utc>,
}

/// Tables and columns order intake reads or writes.
pub const REQUIRED_COLUMNS: &[(&str, &[&str])] = &[
  ("catalog_items", &["sku", "name", "base_price", "has_variants"]),
  ("catalog_variants", &["sku", "color", "size", "price"]),
  ("stock_levels", &["sku", "color", "size", "quantity"]),
  (
    "discount_codes",
    &[
      "code",
      "kind",
      "value",
      "active",
      "starts_at",
      "ends_at",
      "usage_limit",
      "times_used",
      "min_order_amount",
    ],
  ),
  (
    "orders",
    &[
      "id",
      "user_id",
      "payment_method",
      "shipping_method",
      "status",
      "payment_status",
      "total_amount",
      "shipping_address",
      "coupon_code",
      "payment_id",
      "created_at",
    ],
  ),
  (
    "order_line_items",
    &["id", "order_id", "sku", "item_name", "color", "size", "quantity", "unit_price"],
  ),
  ("order_activity_log", &["order_id", "event_type", "message", "actor", "created_at"]),
  (
    "payment_reconciliations",
    &["order_id", "payment_id", "amount", "reason", "created_at"],
  ),
  ("idempotency_keys", &["user_id", "key", "order_id", "created_at"]),
];
