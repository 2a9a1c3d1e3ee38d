use chrono::{NaiveDate, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use order_intake::models::{DiscountCode, DiscountKind, ResolvedLine, ShippingAddress, StockKey};
use order_intake::order_code::code_prefix;
use order_intake::pricing::shipping::ShippingRates;
use order_intake::pricing::{PricingEngine, PricingInput, TaxBase};
use order_intake::services::tax::RateTableTax;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;

fn lines(count: usize) -> Vec<ResolvedLine> {
  (0..count)
    .map(|i| {
      let sku = format!("SKU-{:04}", i);
      ResolvedLine {
        sku: sku.clone(),
        name: format!("Item {}", i),
        color: None,
        size: None,
        quantity: (i % 5 + 1) as i32,
        unit_price: Decimal::new(999 + i as i64 * 7, 2),
        stock_key: StockKey::item(sku),
      }
    })
    .collect()
}

fn engine() -> PricingEngine {
  let tax = RateTableTax::new(
    HashMap::from([("ca".to_string(), Decimal::new(725, 4))]),
    Decimal::new(5, 2),
  );
  PricingEngine::new(ShippingRates::standard(), TaxBase::Merchandise, Arc::new(tax))
}

fn bench_price_order(c: &mut Criterion) {
  let engine = engine();
  let address = ShippingAddress {
    region: Some("CA".to_string()),
    ..Default::default()
  };
  let coupon = DiscountCode {
    code: "WELCOME10".to_string(),
    kind: DiscountKind::Percent,
    value: Decimal::from(10),
    active: true,
    starts_at: None,
    ends_at: None,
    usage_limit: None,
    times_used: 0,
    min_order_amount: None,
  };
  let now = Utc::now();

  let mut group = c.benchmark_group("price_order");
  for count in [1usize, 10, 100] {
    let lines = lines(count);
    group.throughput(Throughput::Elements(count as u64));
    group.bench_with_input(BenchmarkId::new("with_coupon", count), &lines, |b, lines| {
      b.iter(|| {
        engine
          .price(PricingInput {
            lines: black_box(lines),
            shipping_method: "usps",
            address: &address,
            coupon_code: Some("welcome10"),
            coupon: Some(&coupon),
            now,
          })
          .unwrap()
      })
    });
  }
  group.finish();
}

fn bench_order_code_prefix(c: &mut Criterion) {
  let date = NaiveDate::from_ymd_opt(2024, 11, 28).unwrap();
  c.bench_function("order_code_prefix_numeric", |b| {
    b.iter(|| code_prefix(black_box("user-1007"), date, "fedex"))
  });
  c.bench_function("order_code_prefix_hashed", |b| {
    b.iter(|| code_prefix(black_box("alice@example.com"), date, "fedex"))
  });
}

criterion_group!(benches, bench_price_order, bench_order_code_prefix);
criterion_main!(benches);
