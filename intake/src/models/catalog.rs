// order_intake/src/models/catalog.rs

use crate::models::stock::StockKey;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;

/// Current catalog price for one requested line.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct CatalogPrice {
  pub sku: String,
  pub name: String,
  /// Variant price when the exact (color, size) exists, base price otherwise.
  pub unit_price: Decimal,
  /// Items with variants keep stock per (color, size).
  pub has_variants: bool,
}

/// A requested line joined with its catalog price.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedLine {
  pub sku: String,
  pub name: String,
  pub color: Option<String>,
  pub size: Option<String>,
  pub quantity: i32,
  pub unit_price: Decimal,
  #[serde(skip)]
  pub stock_key: StockKey,
}
