// order_intake/src/order_code.rs

//! Order identifiers: `CC` `M` `DD` `S` `RR`.
//!
//! `CC` is derived from the customer, `M` is the month as a letter (A = Jan
//! through L = Dec), `DD` the day of month, `S` the shipping-method letter and
//! `RR` a random two-digit suffix. The random part leaves 100 codes per
//! customer, day and method, so every candidate is checked against existing
//! orders before it is handed out.

use crate::errors::Result;
use crate::models::ShippingMethod;
use crate::store::OrderStore;
use chrono::{Datelike, NaiveDate};
use rand::Rng;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};
use uuid::Uuid;

const MONTH_LETTERS: [char; 12] = ['A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L'];

#[derive(Debug, Clone, Copy)]
pub struct OrderCodeGenerator {
  max_attempts: u32,
}

impl OrderCodeGenerator {
  pub fn new(max_attempts: u32) -> Self {
    Self {
      max_attempts: max_attempts.max(1),
    }
  }

  /// Returns a code no existing order uses. After `max_attempts` collisions
  /// it switches to the longer `CCMDDS-xxxxxxxx` form.
  pub async fn generate(
    &self,
    customer: &str,
    date: NaiveDate,
    shipping_method: &str,
    orders: &dyn OrderStore,
  ) -> Result<String> {
    let prefix = code_prefix(customer, date, shipping_method);
    for attempt in 1..=self.max_attempts {
      let candidate = format!("{}{:02}", prefix, random_suffix());
      if !orders.order_id_exists(&candidate).await? {
        return Ok(candidate);
      }
      debug!(%candidate, attempt, "Order code collision, drawing a new suffix.");
    }

    let unique = Uuid::new_v4().simple().to_string();
    let fallback = format!("{}-{}", prefix, &unique[..8]);
    warn!(%fallback, attempts = self.max_attempts, "Order code space exhausted; using fallback format.");
    Ok(fallback)
  }
}

fn random_suffix() -> u8 {
  rand::thread_rng().gen_range(0..100)
}

/// The deterministic first six characters.
pub fn code_prefix(customer: &str, date: NaiveDate, shipping_method: &str) -> String {
  format!(
    "{:02}{}{:02}{}",
    customer_digits(customer),
    month_letter(date.month()),
    date.day(),
    ShippingMethod::code_for(shipping_method)
  )
}

/// Two-digit customer component.
///
/// Identifiers shaped like `U42`, `user-1007` or `42` (non-digits, then
/// digits) use their last two digits; anything else hashes to a stable value.
pub fn customer_digits(customer: &str) -> u8 {
  let customer = customer.trim();
  let digits_start = customer
    .char_indices()
    .find(|(_, c)| c.is_ascii_digit())
    .map(|(i, _)| i);
  if let Some(start) = digits_start {
    let tail = &customer[start..];
    if tail.chars().all(|c| c.is_ascii_digit()) {
      let last_two: String = tail.chars().rev().take(2).collect::<Vec<_>>().into_iter().rev().collect();
      if let Ok(value) = last_two.parse::<u8>() {
        return value % 100;
      }
    }
  }
  let digest = Sha256::digest(customer.as_bytes());
  let mut head = [0u8; 8];
  head.copy_from_slice(&digest[..8]);
  (u64::from_be_bytes(head) % 100) as u8
}

/// `1` -> `A`, ..., `12` -> `L`.
pub fn month_letter(month: u32) -> char {
  MONTH_LETTERS[(month.clamp(1, 12) - 1) as usize]
}

/// Whether `code` has the standard eight-character shape.
pub fn is_standard_code(code: &str) -> bool {
  let chars: Vec<char> = code.chars().collect();
  chars.len() == 8
    && chars[0..2].iter().all(char::is_ascii_digit)
    && MONTH_LETTERS.contains(&chars[2])
    && chars[3..5].iter().all(char::is_ascii_digit)
    && ShippingMethod::CODES.contains(&chars[5])
    && chars[6..8].iter().all(char::is_ascii_digit)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn numeric_customers_use_last_two_digits() {
    assert_eq!(customer_digits("U42"), 42);
    assert_eq!(customer_digits("user-1007"), 7);
    assert_eq!(customer_digits("42"), 42);
    assert_eq!(customer_digits("5"), 5);
  }

  #[test]
  fn other_customers_hash_stably() {
    let first = customer_digits("alice@example.com");
    assert_eq!(first, customer_digits("alice@example.com"));
    assert!(first < 100);
    // Digits followed by letters do not match the numeric pattern.
    assert!(customer_digits("42abc") < 100);
  }

  #[test]
  fn prefix_encodes_month_day_and_method() {
    let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
    assert_eq!(code_prefix("U42", date, "USPS"), "42C07U");
    assert_eq!(code_prefix("U42", date, "carrier pigeon"), "42C07P");
    let december = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
    assert_eq!(code_prefix("user-1007", december, "FedEx"), "07L31F");
  }

  #[test]
  fn shape_check() {
    assert!(is_standard_code("42C07U19"));
    assert!(!is_standard_code("42M07U19"));
    assert!(!is_standard_code("42C07X19"));
    assert!(!is_standard_code("42C07U-1a2b3c4d"));
  }
}
