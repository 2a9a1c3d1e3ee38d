// tests/postgres_tests.rs
//
// Runs against a live database loaded with schema.sql. Every test returns
// early when DATABASE_URL is unset.

mod common;

use common::*;
use order_intake::errors::AppError;
use order_intake::models::{
  NewOrder, NewOrderLineItem, OrderStatus, PaymentMethod, PaymentStatus, ShippingAddress, StockKey,
};
use order_intake::store::{OrderStore, PgStore, StockLedger};
use serial_test::serial;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;
use uuid::Uuid;

async fn connect() -> Option<PgStore> {
  setup_tracing();
  let url = match std::env::var("DATABASE_URL") {
    Ok(url) => url,
    Err(_) => {
      tracing::warn!("DATABASE_URL not set; skipping Postgres test.");
      return None;
    }
  };
  let pool = PgPoolOptions::new().max_connections(4).connect(&url).await.unwrap();
  Some(PgStore::new(pool, Duration::from_secs(3600)))
}

fn unique(prefix: &str) -> String {
  let id = Uuid::new_v4().simple().to_string();
  format!("{}{}", prefix, &id[..16])
}

async fn seed_item(store: &PgStore, sku: &str, quantity: i32) {
  sqlx::query("INSERT INTO catalog_items (sku, name, base_price, has_variants) VALUES ($1, 'Last Mug', 22.50, FALSE)")
    .bind(sku)
    .execute(store.pool())
    .await
    .unwrap();
  sqlx::query("INSERT INTO stock_levels (sku, color, size, quantity) VALUES ($1, NULL, NULL, $2)")
    .bind(sku)
    .bind(quantity)
    .execute(store.pool())
    .await
    .unwrap();
}

async fn clean_up(store: &PgStore, sku: &str, order_ids: &[String]) {
  for statement in [
    "DELETE FROM idempotency_keys WHERE order_id = ANY($1)",
    "DELETE FROM order_line_items WHERE order_id = ANY($1)",
    "DELETE FROM orders WHERE id = ANY($1)",
  ] {
    sqlx::query(statement).bind(order_ids).execute(store.pool()).await.unwrap();
  }
  for statement in ["DELETE FROM stock_levels WHERE sku = $1", "DELETE FROM catalog_items WHERE sku = $1"] {
    sqlx::query(statement).bind(sku).execute(store.pool()).await.unwrap();
  }
}

fn order_for(user: &str, sku: &str, key: Option<&str>) -> NewOrder {
  NewOrder {
    id: unique("PG"),
    user_id: user.to_string(),
    payment_method: PaymentMethod::Cash,
    shipping_method: "pickup".to_string(),
    status: OrderStatus::Pending,
    payment_status: PaymentStatus::Pending,
    total_amount: dec("22.50"),
    shipping_address: ShippingAddress::default(),
    coupon_code: None,
    payment_id: None,
    lines: vec![NewOrderLineItem {
      sku: sku.to_string(),
      item_name: "Last Mug".to_string(),
      stock_key: StockKey::item(sku),
      color: None,
      size: None,
      quantity: 1,
      unit_price: dec("22.50"),
    }],
    idempotency_key: key.map(str::to_string),
    created_at: chrono::Utc::now(),
  }
}

#[tokio::test]
#[serial]
async fn concurrent_writes_for_the_last_unit_commit_once() {
  let Some(store) = connect().await else { return };
  let sku = unique("PGT-");
  seed_item(&store, &sku, 1).await;

  let first = order_for("U1", &sku, None);
  let second = order_for("U2", &sku, None);
  let (a, b) = tokio::join!(store.write_order(&first), store.write_order(&second));

  let results = [a, b];
  assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
  for result in &results {
    if let Err(err) = result {
      assert!(matches!(err, AppError::InsufficientStock { available: 0, .. }), "got {:?}", err);
    }
  }
  assert_eq!(store.available(&StockKey::item(&sku)).await.unwrap(), Some(0));

  // The loser's transaction left no order row behind.
  let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE id = ANY($1)")
    .bind([first.id.clone(), second.id.clone()].as_slice())
    .fetch_one(store.pool())
    .await
    .unwrap();
  assert_eq!(rows, 1);

  clean_up(&store, &sku, &[first.id, second.id]).await;
}

#[tokio::test]
#[serial]
async fn idempotency_keys_are_claimed_per_user() {
  let Some(store) = connect().await else { return };
  let sku = unique("PGT-");
  seed_item(&store, &sku, 5).await;

  let first = order_for("U1", &sku, Some("checkout-1"));
  let other_user = order_for("U2", &sku, Some("checkout-1"));
  let repeat = order_for("U1", &sku, Some("checkout-1"));

  store.write_order(&first).await.unwrap();
  store.write_order(&other_user).await.unwrap();
  let duplicate = store.write_order(&repeat).await;
  assert!(matches!(duplicate, Err(AppError::DuplicateSubmission(ref key)) if key == "checkout-1"));

  let found = store.find_order_by_idempotency_key("U2", "checkout-1").await.unwrap().unwrap();
  assert_eq!(found.id, other_user.id);
  let found = store.find_order_by_idempotency_key("U1", "checkout-1").await.unwrap().unwrap();
  assert_eq!(found.id, first.id);
  assert!(store.find_order_by_idempotency_key("U3", "checkout-1").await.unwrap().is_none());

  // The rejected duplicate took no stock.
  assert_eq!(store.available(&StockKey::item(&sku)).await.unwrap(), Some(3));

  clean_up(&store, &sku, &[first.id, other_user.id, repeat.id]).await;
}
