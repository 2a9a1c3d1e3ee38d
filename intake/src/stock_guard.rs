// order_intake/src/stock_guard.rs

//! Advisory oversell pre-check.
//!
//! Runs before payment so a short item fails with a clear message instead of
//! a charge and a refund. It does not reserve anything: the conditional
//! decrement in the order write is what actually prevents overselling.

use crate::errors::{AppError, Result};
use crate::models::{ResolvedLine, StockKey};
use crate::store::StockLedger;
use tracing::debug;

/// Requested quantity per stock row, in first-seen order.
pub fn aggregate_demand(lines: &[ResolvedLine]) -> Vec<(&StockKey, i32, &str)> {
  let mut demand: Vec<(&StockKey, i32, &str)> = Vec::new();
  for line in lines {
    match demand.iter_mut().find(|(key, _, _)| **key == line.stock_key) {
      Some(entry) => entry.1 += line.quantity,
      None => demand.push((&line.stock_key, line.quantity, line.name.as_str())),
    }
  }
  demand
}

/// Fails with `InsufficientStock` for the first row that cannot cover its
/// demand. A missing stock row counts as zero available.
pub async fn check_availability(ledger: &dyn StockLedger, lines: &[ResolvedLine]) -> Result<()> {
  for (key, requested, item_name) in aggregate_demand(lines) {
    let available = ledger.available(key).await?.unwrap_or(0);
    debug!(stock_key = %key, requested, available, "Stock pre-check.");
    if requested > available {
      return Err(AppError::InsufficientStock {
        item_name: item_name.to_string(),
        requested,
        available,
        color: key.color.clone(),
        size: key.size.clone(),
      });
    }
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::store::MemoryStore;
  use rust_decimal::Decimal;

  fn line(sku: &str, color: Option<&str>, quantity: i32) -> ResolvedLine {
    let color = color.map(str::to_string);
    ResolvedLine {
      sku: sku.to_string(),
      name: format!("{} item", sku),
      color: color.clone(),
      size: None,
      quantity,
      unit_price: Decimal::ONE,
      stock_key: StockKey::variant(sku, color, None),
    }
  }

  #[tokio::test]
  async fn repeated_lines_are_summed() {
    let store = MemoryStore::new().with_stock(StockKey::variant("A", Some("red".into()), None), 3);
    let lines = vec![line("A", Some("red"), 2), line("A", Some("red"), 2)];
    let err = check_availability(&store, &lines).await.unwrap_err();
    match err {
      AppError::InsufficientStock {
        requested,
        available,
        color,
        ..
      } => {
        assert_eq!((requested, available), (4, 3));
        assert_eq!(color.as_deref(), Some("red"));
      }
      other => panic!("unexpected error: {other}"),
    }
  }

  #[tokio::test]
  async fn missing_row_counts_as_zero() {
    let store = MemoryStore::new();
    let err = check_availability(&store, &[line("B", None, 1)]).await.unwrap_err();
    assert!(matches!(err, AppError::InsufficientStock { available: 0, .. }));
  }
}
