// order_intake/src/config.rs

use crate::errors::{AppError, Result};
use crate::pricing::shipping::ShippingRates;
use crate::pricing::TaxBase;
use dotenvy::dotenv;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
  Postgres,
  /// Seeded, process-local store for demos and local development.
  Memory,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  pub database_url: Option<String>,
  pub store_backend: StoreBackend,

  pub currency: String,
  pub shipping_rates: ShippingRates,
  pub tax_rates: HashMap<String, Decimal>,
  pub tax_default_rate: Decimal,
  pub tax_base: TaxBase,
  /// Client/server total drift tolerated without a warning.
  pub client_total_epsilon: Decimal,

  pub payment_processor_url: Option<String>,
  pub payment_timeout: Duration,
  /// Whether the processor exposes the idempotent capture status lookup.
  pub payment_status_check: bool,

  pub order_code_max_attempts: u32,
  pub idempotency_ttl: Duration,

  pub notify_sender: String,
  pub notify_admin_email: String,
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      server_host: "127.0.0.1".to_string(),
      server_port: 8080,
      database_url: None,
      store_backend: StoreBackend::Postgres,
      currency: "USD".to_string(),
      shipping_rates: ShippingRates::standard(),
      tax_rates: HashMap::new(),
      tax_default_rate: Decimal::ZERO,
      tax_base: TaxBase::Merchandise,
      client_total_epsilon: Decimal::new(1, 2),
      payment_processor_url: None,
      payment_timeout: Duration::from_millis(10_000),
      payment_status_check: true,
      order_code_max_attempts: 5,
      idempotency_ttl: Duration::from_secs(86_400),
      notify_sender: "noreply@example.com".to_string(),
      notify_admin_email: "orders@example.com".to_string(),
    }
  }
}

fn parse_var<T: FromStr>(var_name: &str, raw: &str) -> Result<T>
where
  T::Err: std::fmt::Display,
{
  raw
    .trim()
    .parse::<T>()
    .map_err(|e| AppError::Config(format!("Invalid {}: {}", var_name, e)))
}

/// Parses `KEY=value,KEY2=value2` into lowercase keys and decimal values.
pub(crate) fn parse_decimal_table(var_name: &str, raw: &str) -> Result<Vec<(String, Decimal)>> {
  raw
    .split(',')
    .map(str::trim)
    .filter(|entry| !entry.is_empty())
    .map(|entry| {
      let (key, value) = entry
        .split_once('=')
        .ok_or_else(|| AppError::Config(format!("Invalid {} entry '{}': expected key=value", var_name, entry)))?;
      Ok((key.trim().to_lowercase(), parse_var::<Decimal>(var_name, value)?))
    })
    .collect()
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok();

    let get_env = |var_name: &str| env::var(var_name).ok().filter(|v| !v.trim().is_empty());
    let defaults = Self::default();

    let server_host = get_env("SERVER_HOST").unwrap_or(defaults.server_host);
    let server_port = match get_env("SERVER_PORT") {
      Some(raw) => parse_var("SERVER_PORT", &raw)?,
      None => defaults.server_port,
    };

    let store_backend = match get_env("STORE_BACKEND").as_deref().map(str::to_lowercase).as_deref() {
      None | Some("postgres") => StoreBackend::Postgres,
      Some("memory") => StoreBackend::Memory,
      Some(other) => return Err(AppError::Config(format!("Invalid STORE_BACKEND: {}", other))),
    };
    let database_url = get_env("DATABASE_URL");
    if store_backend == StoreBackend::Postgres && database_url.is_none() {
      return Err(AppError::Config(
        "Missing environment variable 'DATABASE_URL' (required for STORE_BACKEND=postgres)".to_string(),
      ));
    }

    let baseline = match get_env("SHIPPING_BASELINE") {
      Some(raw) => parse_var("SHIPPING_BASELINE", &raw)?,
      None => defaults.shipping_rates.baseline(),
    };
    let shipping_rates = match get_env("SHIPPING_RATES") {
      Some(raw) => ShippingRates::from_table(&parse_decimal_table("SHIPPING_RATES", &raw)?, baseline)?,
      None => defaults.shipping_rates.with_baseline(baseline),
    };

    let tax_rates = match get_env("TAX_RATES") {
      Some(raw) => parse_decimal_table("TAX_RATES", &raw)?.into_iter().collect(),
      None => HashMap::new(),
    };
    let tax_default_rate = match get_env("TAX_DEFAULT_RATE") {
      Some(raw) => parse_var("TAX_DEFAULT_RATE", &raw)?,
      None => defaults.tax_default_rate,
    };
    let tax_base = match get_env("TAX_INCLUDES_SHIPPING") {
      Some(raw) if parse_var::<bool>("TAX_INCLUDES_SHIPPING", &raw)? => TaxBase::MerchandiseAndShipping,
      _ => TaxBase::Merchandise,
    };
    let client_total_epsilon = match get_env("CLIENT_TOTAL_EPSILON") {
      Some(raw) => parse_var("CLIENT_TOTAL_EPSILON", &raw)?,
      None => defaults.client_total_epsilon,
    };

    let payment_timeout = match get_env("PAYMENT_TIMEOUT_MS") {
      Some(raw) => Duration::from_millis(parse_var("PAYMENT_TIMEOUT_MS", &raw)?),
      None => defaults.payment_timeout,
    };
    let payment_status_check = match get_env("PAYMENT_STATUS_CHECK") {
      Some(raw) => parse_var("PAYMENT_STATUS_CHECK", &raw)?,
      None => defaults.payment_status_check,
    };
    let order_code_max_attempts = match get_env("ORDER_CODE_MAX_ATTEMPTS") {
      Some(raw) => parse_var("ORDER_CODE_MAX_ATTEMPTS", &raw)?,
      None => defaults.order_code_max_attempts,
    };
    let idempotency_ttl = match get_env("IDEMPOTENCY_TTL_SECS") {
      Some(raw) => Duration::from_secs(parse_var("IDEMPOTENCY_TTL_SECS", &raw)?),
      None => defaults.idempotency_ttl,
    };

    tracing::info!(
      backend = ?store_backend,
      tax_base = ?tax_base,
      status_check = payment_status_check,
      "Application configuration loaded successfully."
    );

    Ok(Self {
      server_host,
      server_port,
      database_url,
      store_backend,
      currency: get_env("CURRENCY").unwrap_or(defaults.currency),
      shipping_rates,
      tax_rates,
      tax_default_rate,
      tax_base,
      client_total_epsilon,
      payment_processor_url: get_env("PAYMENT_PROCESSOR_URL"),
      payment_timeout,
      payment_status_check,
      order_code_max_attempts,
      idempotency_ttl,
      notify_sender: get_env("NOTIFY_SENDER").unwrap_or(defaults.notify_sender),
      notify_admin_email: get_env("NOTIFY_ADMIN_EMAIL").unwrap_or(defaults.notify_admin_email),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn decimal_table_lowercases_keys_and_skips_blanks() {
    let table = parse_decimal_table("X", "USPS=5, ups=8.50,,").unwrap();
    assert_eq!(
      table,
      vec![
        ("usps".to_string(), Decimal::new(5, 0)),
        ("ups".to_string(), Decimal::new(850, 2)),
      ]
    );
  }

  #[test]
  fn decimal_table_rejects_missing_separator() {
    assert!(matches!(parse_decimal_table("X", "usps5"), Err(AppError::Config(_))));
  }
}
