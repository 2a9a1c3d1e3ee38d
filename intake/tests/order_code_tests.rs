// tests/order_code_tests.rs

mod common;

use chrono::NaiveDate;
use common::{setup_tracing, shop, FaultyOrderStore};
use order_intake::order_code::{code_prefix, is_standard_code, OrderCodeGenerator};
use serial_test::serial;
use std::collections::HashSet;
use std::sync::atomic::Ordering;
use std::sync::Arc;

fn march_seventh() -> NaiveDate {
  NaiveDate::from_ymd_opt(2024, 3, 7).unwrap()
}

#[tokio::test]
#[serial]
async fn generated_code_has_standard_shape() {
  setup_tracing();
  let store = Arc::new(shop());

  let code = OrderCodeGenerator::new(5)
    .generate("U42", march_seventh(), "USPS", store.as_ref())
    .await
    .unwrap();

  assert!(is_standard_code(&code), "{}", code);
  assert!(code.starts_with("42C07U"), "{}", code);
}

#[tokio::test]
#[serial]
async fn collision_draws_a_new_suffix() {
  setup_tracing();
  let orders = FaultyOrderStore::new(Arc::new(shop())).colliding(2);

  let code = OrderCodeGenerator::new(5)
    .generate("U42", march_seventh(), "fedex", &orders)
    .await
    .unwrap();

  assert!(is_standard_code(&code), "{}", code);
  assert!(code.starts_with("42C07F"));
  assert_eq!(orders.id_checks.load(Ordering::SeqCst), 3);
}

#[tokio::test]
#[serial]
async fn exhausted_attempts_fall_back_to_long_form() {
  setup_tracing();
  let orders = FaultyOrderStore::new(Arc::new(shop())).colliding(usize::MAX);

  let code = OrderCodeGenerator::new(3)
    .generate("U42", march_seventh(), "pickup", &orders)
    .await
    .unwrap();

  assert_eq!(orders.id_checks.load(Ordering::SeqCst), 3);
  assert!(!is_standard_code(&code));
  let (prefix, tail) = code.split_once('-').expect("fallback codes carry a dash");
  assert_eq!(prefix, "42C07P");
  assert_eq!(tail.len(), 8);
  assert!(tail.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn non_numeric_customers_hash_to_a_stable_prefix() {
  let first = code_prefix("alice@example.com", march_seventh(), "ups");
  let second = code_prefix("alice@example.com", march_seventh(), "ups");

  assert_eq!(first, second);
  assert_eq!(first.len(), 6);
  assert!(first[..2].chars().all(|c| c.is_ascii_digit()));
  assert!(first.ends_with("C07S"));
}

#[tokio::test]
#[serial]
async fn codes_for_one_customer_day_and_method_never_repeat() {
  setup_tracing();
  let store = Arc::new(shop());
  let orders = FaultyOrderStore::new(store.clone());
  let generator = OrderCodeGenerator::new(5);
  let mut seen = HashSet::new();

  for _ in 0..60 {
    let code = generator
      .generate("U42", march_seventh(), "usps", &orders)
      .await
      .unwrap();
    assert!(seen.insert(code.clone()), "duplicate code {}", code);
    commit_placeholder(&store, &code).await;
  }
}

async fn commit_placeholder(store: &Arc<order_intake::store::MemoryStore>, code: &str) {
  use order_intake::models::{NewOrder, OrderStatus, PaymentMethod, PaymentStatus, ShippingAddress};
  use order_intake::store::OrderStore;

  let order = NewOrder {
    id: code.to_string(),
    user_id: "U42".to_string(),
    payment_method: PaymentMethod::Cash,
    shipping_method: "usps".to_string(),
    status: OrderStatus::Pending,
    payment_status: PaymentStatus::Pending,
    total_amount: rust_decimal::Decimal::ZERO,
    shipping_address: ShippingAddress::default(),
    coupon_code: None,
    payment_id: None,
    lines: Vec::new(),
    idempotency_key: None,
    created_at: chrono::Utc::now(),
  };
  store.write_order(&order).await.unwrap();
}
