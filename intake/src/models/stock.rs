// order_intake/src/models/stock.rs

use serde::Serialize;
use std::fmt;

/// Identifies one stock row: an item, or one (color, size) variant of it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct StockKey {
  pub sku: String,
  pub color: Option<String>,
  pub size: Option<String>,
}

impl StockKey {
  pub fn item(sku: impl Into<String>) -> Self {
    Self {
      sku: sku.into(),
      color: None,
      size: None,
    }
  }

  pub fn variant(sku: impl Into<String>, color: Option<String>, size: Option<String>) -> Self {
    Self {
      sku: sku.into(),
      color,
      size,
    }
  }
}

impl fmt::Display for StockKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.sku)?;
    if let Some(color) = &self.color {
      write!(f, "/{}", color)?;
    }
    if let Some(size) = &self.size {
      write!(f, "/{}", size)?;
    }
    Ok(())
  }
}
