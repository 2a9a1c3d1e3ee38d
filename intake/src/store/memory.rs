// order_intake/src/store/memory.rs

use crate::errors::{AppError, Result};
use crate::models::{
  CatalogPrice, DiscountCode, DiscountKind, NewOrder, Order, OrderLineItem, StockKey,
};
use crate::store::{CatalogStore, CouponStore, OrderStore, ReconciliationEntry, SchemaProbe, StockLedger};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use sqlx::types::Json;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
struct CatalogItem {
  name: String,
  base_price: Decimal,
  variant_prices: HashMap<(Option<String>, Option<String>), Decimal>,
  has_variants: bool,
}

#[derive(Default)]
struct MemoryState {
  items: HashMap<String, CatalogItem>,
  stock: HashMap<StockKey, i32>,
  coupons: HashMap<String, DiscountCode>,
  orders: Vec<(Order, Vec<OrderLineItem>)>,
  /// (user id, key) -> (order id, claimed at)
  idempotency_keys: HashMap<(String, String), (String, DateTime<Utc>)>,
  reconciliations: Vec<ReconciliationEntry>,
}

/// Process-local store. One mutex guards all state, so an order write is
/// atomic exactly like the Postgres transaction.
pub struct MemoryStore {
  state: Mutex<MemoryState>,
  idempotency_ttl: chrono::Duration,
}

impl Default for MemoryStore {
  fn default() -> Self {
    Self::new()
  }
}

impl MemoryStore {
  pub fn new() -> Self {
    Self {
      state: Mutex::new(MemoryState::default()),
      idempotency_ttl: chrono::Duration::hours(24),
    }
  }

  pub fn with_idempotency_ttl(mut self, ttl: Duration) -> Self {
    self.idempotency_ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(36_500));
    self
  }

  pub fn with_item(mut self, sku: &str, name: &str, base_price: Decimal) -> Self {
    self.state.get_mut().items.insert(
      sku.to_string(),
      CatalogItem {
        name: name.to_string(),
        base_price,
        variant_prices: HashMap::new(),
        has_variants: false,
      },
    );
    self
  }

  /// Adds a (color, size) variant of an existing item. `price` overrides the
  /// base price for that variant.
  pub fn with_variant(mut self, sku: &str, color: Option<&str>, size: Option<&str>, price: Option<Decimal>) -> Self {
    if let Some(item) = self.state.get_mut().items.get_mut(sku) {
      item.has_variants = true;
      if let Some(price) = price {
        item
          .variant_prices
          .insert((color.map(str::to_string), size.map(str::to_string)), price);
      }
    }
    self
  }

  pub fn with_stock(mut self, key: StockKey, quantity: i32) -> Self {
    self.state.get_mut().stock.insert(key, quantity);
    self
  }

  pub fn with_coupon(mut self, coupon: DiscountCode) -> Self {
    self.state.get_mut().coupons.insert(coupon.code.to_lowercase(), coupon);
    self
  }

  /// Small catalog used by the demo server.
  pub fn seeded_demo() -> Self {
    Self::new()
      .with_item("WF-TS-001", "Woodland Fox Tee", Decimal::new(1000, 2))
      .with_stock(StockKey::item("WF-TS-001"), 25)
      .with_item("HD-MUG-002", "Handmade Stoneware Mug", Decimal::new(2250, 2))
      .with_stock(StockKey::item("HD-MUG-002"), 8)
      .with_item("WF-HD-003", "Woodland Fox Hoodie", Decimal::new(4200, 2))
      .with_variant("WF-HD-003", Some("Forest"), Some("M"), None)
      .with_variant("WF-HD-003", Some("Forest"), Some("XL"), Some(Decimal::new(4600, 2)))
      .with_variant("WF-HD-003", Some("Ash"), Some("M"), None)
      .with_stock(
        StockKey::variant("WF-HD-003", Some("Forest".into()), Some("M".into())),
        5,
      )
      .with_stock(
        StockKey::variant("WF-HD-003", Some("Forest".into()), Some("XL".into())),
        2,
      )
      .with_stock(StockKey::variant("WF-HD-003", Some("Ash".into()), Some("M".into())), 0)
      .with_coupon(DiscountCode {
        code: "WELCOME10".to_string(),
        kind: DiscountKind::Percent,
        value: Decimal::from(10),
        active: true,
        starts_at: None,
        ends_at: None,
        usage_limit: None,
        times_used: 0,
        min_order_amount: None,
      })
      .with_coupon(DiscountCode {
        code: "FIVEOFF".to_string(),
        kind: DiscountKind::Fixed,
        value: Decimal::from(5),
        active: true,
        starts_at: None,
        ends_at: None,
        usage_limit: Some(100),
        times_used: 0,
        min_order_amount: Some(Decimal::from(25)),
      })
  }

  pub fn stock_of(&self, key: &StockKey) -> Option<i32> {
    self.state.lock().stock.get(key).copied()
  }

  pub fn orders(&self) -> Vec<Order> {
    self.state.lock().orders.iter().map(|(order, _)| order.clone()).collect()
  }

  pub fn reconciliations(&self) -> Vec<ReconciliationEntry> {
    self.state.lock().reconciliations.clone()
  }

  pub fn coupon_usage(&self, code: &str) -> Option<i32> {
    self.state.lock().coupons.get(&code.to_lowercase()).map(|c| c.times_used)
  }

  fn key_is_live(&self, created_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    created_at + self.idempotency_ttl > now
  }
}

#[async_trait]
impl CatalogStore for MemoryStore {
  async fn price_for(&self, sku: &str, color: Option<&str>, size: Option<&str>) -> Result<Option<CatalogPrice>> {
    let state = self.state.lock();
    Ok(state.items.get(sku).map(|item| {
      let variant = (color.map(str::to_string), size.map(str::to_string));
      CatalogPrice {
        sku: sku.to_string(),
        name: item.name.clone(),
        unit_price: item.variant_prices.get(&variant).copied().unwrap_or(item.base_price),
        has_variants: item.has_variants,
      }
    }))
  }
}

#[async_trait]
impl CouponStore for MemoryStore {
  async fn find_coupon(&self, code: &str) -> Result<Option<DiscountCode>> {
    Ok(self.state.lock().coupons.get(&code.trim().to_lowercase()).cloned())
  }
}

#[async_trait]
impl StockLedger for MemoryStore {
  async fn available(&self, key: &StockKey) -> Result<Option<i32>> {
    Ok(self.state.lock().stock.get(key).copied())
  }
}

#[async_trait]
impl OrderStore for MemoryStore {
  async fn order_id_exists(&self, order_id: &str) -> Result<bool> {
    Ok(self.state.lock().orders.iter().any(|(order, _)| order.id == order_id))
  }

  async fn write_order(&self, new_order: &NewOrder) -> Result<Order> {
    let now = Utc::now();
    let mut state = self.state.lock();

    if state.orders.iter().any(|(order, _)| order.id == new_order.id) {
      return Err(AppError::Internal(format!("Order id {} already exists", new_order.id)));
    }
    let claim = new_order
      .idempotency_key
      .as_ref()
      .map(|key| (new_order.user_id.clone(), key.clone()));
    if let Some(claim) = &claim {
      if let Some((_, created_at)) = state.idempotency_keys.get(claim) {
        if self.key_is_live(*created_at, now) {
          return Err(AppError::DuplicateSubmission(claim.1.clone()));
        }
      }
    }

    // Check every row first so a short row leaves all stock untouched.
    let decrements = new_order.stock_decrements();
    for (key, quantity, item_name) in &decrements {
      let available = state.stock.get(key).copied().unwrap_or(0);
      if available < *quantity {
        warn!(stock_key = %key, requested = quantity, available, "Conditional stock decrement failed; order rolled back.");
        return Err(AppError::InsufficientStock {
          item_name: item_name.clone(),
          requested: *quantity,
          available,
          color: key.color.clone(),
          size: key.size.clone(),
        });
      }
    }
    for (key, quantity, _) in &decrements {
      if let Some(level) = state.stock.get_mut(key) {
        *level -= quantity;
      }
    }

    let order = Order {
      id: new_order.id.clone(),
      user_id: new_order.user_id.clone(),
      payment_method: new_order.payment_method.as_str().to_string(),
      shipping_method: new_order.shipping_method.clone(),
      status: new_order.status,
      payment_status: new_order.payment_status,
      total_amount: new_order.total_amount,
      shipping_address: Json(new_order.shipping_address.clone()),
      coupon_code: new_order.coupon_code.clone(),
      payment_id: new_order.payment_id.clone(),
      created_at: new_order.created_at,
    };
    let lines = new_order
      .lines
      .iter()
      .map(|line| OrderLineItem {
        id: Uuid::new_v4(),
        order_id: new_order.id.clone(),
        sku: line.sku.clone(),
        item_name: line.item_name.clone(),
        color: line.color.clone(),
        size: line.size.clone(),
        quantity: line.quantity,
        unit_price: line.unit_price,
      })
      .collect();

    if let Some(code) = &new_order.coupon_code {
      if let Some(coupon) = state.coupons.get_mut(&code.to_lowercase()) {
        coupon.times_used += 1;
      }
    }
    if let Some(claim) = claim {
      state.idempotency_keys.insert(claim, (new_order.id.clone(), now));
    }
    state.orders.push((order.clone(), lines));

    info!(order_id = %order.id, total = %order.total_amount, "Order committed.");
    Ok(order)
  }

  async fn find_order(&self, order_id: &str) -> Result<Option<(Order, Vec<OrderLineItem>)>> {
    Ok(
      self
        .state
        .lock()
        .orders
        .iter()
        .find(|(order, _)| order.id == order_id)
        .cloned(),
    )
  }

  async fn find_order_by_idempotency_key(&self, user_id: &str, key: &str) -> Result<Option<Order>> {
    let state = self.state.lock();
    let claim = (user_id.to_string(), key.to_string());
    let Some((order_id, created_at)) = state.idempotency_keys.get(&claim) else {
      return Ok(None);
    };
    if !self.key_is_live(*created_at, Utc::now()) {
      return Ok(None);
    }
    Ok(
      state
        .orders
        .iter()
        .find(|(order, _)| &order.id == order_id)
        .map(|(order, _)| order.clone()),
    )
  }

  async fn flag_for_reconciliation(&self, entry: &ReconciliationEntry) -> Result<()> {
    self.state.lock().reconciliations.push(entry.clone());
    Ok(())
  }
}

#[async_trait]
impl SchemaProbe for MemoryStore {
  async fn missing_schema(&self) -> Result<Vec<String>> {
    Ok(Vec::new())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn variant_price_falls_back_to_base() {
    let store = MemoryStore::seeded_demo();
    let xl = store.price_for("WF-HD-003", Some("Forest"), Some("XL")).await.unwrap().unwrap();
    assert_eq!(xl.unit_price, Decimal::new(4600, 2));
    let m = store.price_for("WF-HD-003", Some("Forest"), Some("M")).await.unwrap().unwrap();
    assert_eq!(m.unit_price, Decimal::new(4200, 2));
    assert!(m.has_variants);
    assert!(store.price_for("NOPE", None, None).await.unwrap().is_none());
  }

  #[tokio::test]
  async fn coupon_lookup_ignores_case() {
    let store = MemoryStore::seeded_demo();
    assert!(store.find_coupon("welcome10").await.unwrap().is_some());
  }
}
