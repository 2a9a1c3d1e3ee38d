// order_intake/src/store/postgres.rs

use crate::errors::{AppError, Result};
use crate::models::{CatalogPrice, DiscountCode, NewOrder, Order, OrderLineItem, StockKey};
use crate::store::{
  CatalogStore, CouponStore, OrderStore, ReconciliationEntry, SchemaProbe, StockLedger, REQUIRED_COLUMNS,
};
use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{info, instrument, warn};
use uuid::Uuid;

const ORDER_COLUMNS: &str = "id, user_id, payment_method, shipping_method, status, payment_status, \
   total_amount, shipping_address, coupon_code, payment_id, created_at";

/// Postgres-backed store. Every order mutation goes through
/// [`OrderStore::write_order`], which runs as one transaction.
#[derive(Clone)]
pub struct PgStore {
  pool: PgPool,
  idempotency_ttl: Duration,
}

impl PgStore {
  pub fn new(pool: PgPool, idempotency_ttl: Duration) -> Self {
    Self { pool, idempotency_ttl }
  }

  pub fn pool(&self) -> &PgPool {
    &self.pool
  }

  fn ttl_secs(&self) -> f64 {
    self.idempotency_ttl.as_secs_f64()
  }

  async fn stock_in_tx(tx: &mut Transaction<'_, Postgres>, key: &StockKey) -> Result<i32> {
    let quantity = sqlx::query_scalar::<_, i32>(
      r#"
      SELECT quantity FROM stock_levels
      WHERE sku = $1 AND color IS NOT DISTINCT FROM $2 AND size IS NOT DISTINCT FROM $3
      "#,
    )
    .bind(&key.sku)
    .bind(&key.color)
    .bind(&key.size)
    .fetch_optional(&mut **tx)
    .await?;
    Ok(quantity.unwrap_or(0))
  }
}

#[async_trait]
impl CatalogStore for PgStore {
  async fn price_for(&self, sku: &str, color: Option<&str>, size: Option<&str>) -> Result<Option<CatalogPrice>> {
    let price = sqlx::query_as::<_, CatalogPrice>(
      r#"
      SELECT i.sku, i.name, COALESCE(v.price, i.base_price) AS unit_price, i.has_variants
      FROM catalog_items i
      LEFT JOIN catalog_variants v
        ON v.sku = i.sku AND v.color IS NOT DISTINCT FROM $2 AND v.size IS NOT DISTINCT FROM $3
      WHERE i.sku = $1
      LIMIT 1
      "#,
    )
    .bind(sku)
    .bind(color)
    .bind(size)
    .fetch_optional(&self.pool)
    .await?;
    Ok(price)
  }
}

#[async_trait]
impl CouponStore for PgStore {
  async fn find_coupon(&self, code: &str) -> Result<Option<DiscountCode>> {
    let coupon = sqlx::query_as::<_, DiscountCode>(
      r#"
      SELECT code, kind, value, active, starts_at, ends_at, usage_limit, times_used, min_order_amount
      FROM discount_codes
      WHERE lower(code) = lower($1)
      "#,
    )
    .bind(code.trim())
    .fetch_optional(&self.pool)
    .await?;
    Ok(coupon)
  }
}

#[async_trait]
impl StockLedger for PgStore {
  async fn available(&self, key: &StockKey) -> Result<Option<i32>> {
    let quantity = sqlx::query_scalar::<_, i32>(
      r#"
      SELECT quantity FROM stock_levels
      WHERE sku = $1 AND color IS NOT DISTINCT FROM $2 AND size IS NOT DISTINCT FROM $3
      "#,
    )
    .bind(&key.sku)
    .bind(&key.color)
    .bind(&key.size)
    .fetch_optional(&self.pool)
    .await?;
    Ok(quantity)
  }
}

#[async_trait]
impl OrderStore for PgStore {
  async fn order_id_exists(&self, order_id: &str) -> Result<bool> {
    let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM orders WHERE id = $1)")
      .bind(order_id)
      .fetch_one(&self.pool)
      .await?;
    Ok(exists)
  }

  #[instrument(name = "pg::write_order", skip(self, new_order), fields(order_id = %new_order.id))]
  async fn write_order(&self, new_order: &NewOrder) -> Result<Order> {
    let mut tx = self.pool.begin().await?;

    let order = sqlx::query_as::<_, Order>(&format!(
      r#"
      INSERT INTO orders ({cols})
      VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
      RETURNING {cols}
      "#,
      cols = ORDER_COLUMNS
    ))
    .bind(&new_order.id)
    .bind(&new_order.user_id)
    .bind(new_order.payment_method.as_str())
    .bind(&new_order.shipping_method)
    .bind(new_order.status)
    .bind(new_order.payment_status)
    .bind(new_order.total_amount)
    .bind(Json(&new_order.shipping_address))
    .bind(&new_order.coupon_code)
    .bind(&new_order.payment_id)
    .bind(new_order.created_at)
    .fetch_one(&mut *tx)
    .await?;

    // One conditional statement per stock row; row locks serialize
    // concurrent buyers and a short row aborts the whole order.
    for (key, quantity, item_name) in new_order.stock_decrements() {
      let decremented = sqlx::query(
        r#"
        UPDATE stock_levels SET quantity = quantity - $1
        WHERE sku = $2 AND color IS NOT DISTINCT FROM $3 AND size IS NOT DISTINCT FROM $4
          AND quantity >= $1
        "#,
      )
      .bind(quantity)
      .bind(&key.sku)
      .bind(&key.color)
      .bind(&key.size)
      .execute(&mut *tx)
      .await?;

      if decremented.rows_affected() == 0 {
        let available = Self::stock_in_tx(&mut tx, &key).await?;
        tx.rollback().await?;
        warn!(stock_key = %key, requested = quantity, available, "Conditional stock decrement failed; order rolled back.");
        return Err(AppError::InsufficientStock {
          item_name,
          requested: quantity,
          available,
          color: key.color,
          size: key.size,
        });
      }
    }

    for line in &new_order.lines {
      sqlx::query(
        r#"
        INSERT INTO order_line_items (id, order_id, sku, item_name, color, size, quantity, unit_price)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
      )
      .bind(Uuid::new_v4())
      .bind(&new_order.id)
      .bind(&line.sku)
      .bind(&line.item_name)
      .bind(&line.color)
      .bind(&line.size)
      .bind(line.quantity)
      .bind(line.unit_price)
      .execute(&mut *tx)
      .await?;
    }

    if let Some(code) = &new_order.coupon_code {
      sqlx::query("UPDATE discount_codes SET times_used = times_used + 1 WHERE lower(code) = lower($1)")
        .bind(code)
        .execute(&mut *tx)
        .await?;
    }

    if let Some(key) = &new_order.idempotency_key {
      // An expired key may be reclaimed; a live one makes this a duplicate.
      let claimed = sqlx::query(
        r#"
        INSERT INTO idempotency_keys (user_id, key, order_id, created_at)
        VALUES ($4, $1, $2, NOW())
        ON CONFLICT (user_id, key) DO UPDATE
          SET order_id = EXCLUDED.order_id, created_at = EXCLUDED.created_at
          WHERE idempotency_keys.created_at <= NOW() - make_interval(secs => $3)
        "#,
      )
      .bind(key)
      .bind(&new_order.id)
      .bind(self.ttl_secs())
      .bind(&new_order.user_id)
      .execute(&mut *tx)
      .await?;
      if claimed.rows_affected() == 0 {
        tx.rollback().await?;
        return Err(AppError::DuplicateSubmission(key.clone()));
      }
    }

    tx.commit().await?;
    info!(order_id = %order.id, total = %order.total_amount, "Order committed.");
    Ok(order)
  }

  async fn find_order(&self, order_id: &str) -> Result<Option<(Order, Vec<OrderLineItem>)>> {
    let order = sqlx::query_as::<_, Order>(&format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS))
      .bind(order_id)
      .fetch_optional(&self.pool)
      .await?;
    let Some(order) = order else {
      return Ok(None);
    };
    let lines = sqlx::query_as::<_, OrderLineItem>(
      r#"
      SELECT id, order_id, sku, item_name, color, size, quantity, unit_price
      FROM order_line_items
      WHERE order_id = $1
      ORDER BY sku, color, size
      "#,
    )
    .bind(order_id)
    .fetch_all(&self.pool)
    .await?;
    Ok(Some((order, lines)))
  }

  async fn find_order_by_idempotency_key(&self, user_id: &str, key: &str) -> Result<Option<Order>> {
    let columns = ORDER_COLUMNS
      .split(',')
      .map(|c| format!("o.{}", c.trim()))
      .collect::<Vec<_>>()
      .join(", ");
    let order = sqlx::query_as::<_, Order>(&format!(
      r#"
      SELECT {}
      FROM idempotency_keys k
      JOIN orders o ON o.id = k.order_id
      WHERE k.user_id = $1 AND k.key = $2 AND k.created_at > NOW() - make_interval(secs => $3)
      "#,
      columns
    ))
    .bind(user_id)
    .bind(key)
    .bind(self.ttl_secs())
    .fetch_optional(&self.pool)
    .await?;
    Ok(order)
  }

  async fn flag_for_reconciliation(&self, entry: &ReconciliationEntry) -> Result<()> {
    sqlx::query(
      r#"
      INSERT INTO payment_reconciliations (order_id, payment_id, amount, reason, created_at)
      VALUES ($1, $2, $3, $4, $5)
      "#,
    )
    .bind(&entry.order_id)
    .bind(&entry.payment_id)
    .bind(entry.amount)
    .bind(&entry.reason)
    .bind(entry.created_at)
    .execute(&self.pool)
    .await?;
    Ok(())
  }
}

#[async_trait]
impl SchemaProbe for PgStore {
  async fn missing_schema(&self) -> Result<Vec<String>> {
    let present: HashSet<(String, String)> = sqlx::query_as::<_, (String, String)>(
      r#"
      SELECT table_name::text, column_name::text
      FROM information_schema.columns
      WHERE table_schema = current_schema()
      "#,
    )
    .fetch_all(&self.pool)
    .await?
    .into_iter()
    .collect();

    Ok(
      REQUIRED_COLUMNS
        .iter()
        .flat_map(|(table, columns)| columns.iter().map(move |column| (*table, *column)))
        .filter(|(table, column)| !present.contains(&(table.to_string(), column.to_string())))
        .map(|(table, column)| format!("{}.{}", table, column))
        .collect(),
    )
  }
}
