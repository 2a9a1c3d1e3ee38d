// order_intake/src/services/secrets.rs

use crate::errors::Result;
use std::collections::HashMap;

/// Name under which the payment processor API key is stored.
pub const PAYMENT_API_KEY: &str = "PAYMENT_PROCESSOR_API_KEY";

/// Read-only access to credentials.
pub trait SecretStore: Send + Sync {
  fn secret(&self, name: &str) -> Result<Option<String>>;
}

/// Secrets from the process environment (and `.env`, once loaded).
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvSecretStore;

impl SecretStore for EnvSecretStore {
  fn secret(&self, name: &str) -> Result<Option<String>> {
    Ok(std::env::var(name).ok().filter(|v| !v.is_empty()))
  }
}

/// Fixed secrets, for wiring tests and local runs.
#[derive(Debug, Default, Clone)]
pub struct StaticSecretStore(pub HashMap<String, String>);

impl SecretStore for StaticSecretStore {
  fn secret(&self, name: &str) -> Result<Option<String>> {
    Ok(self.0.get(name).cloned())
  }
}
