// order_intake/src/store/schema.rs

use crate::errors::{AppError, Result};
use crate::store::SchemaProbe;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info};

/// Process-wide "schema verified" flag.
///
/// The probe runs until it succeeds once; after that [`SchemaGuard::ensure`]
/// is a single atomic load. Failures are not cached, so a schema fixed while
/// the process runs is picked up on the next request.
#[derive(Debug, Default)]
pub struct SchemaGuard {
  verified: AtomicBool,
}

impl SchemaGuard {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_verified(&self) -> bool {
    self.verified.load(Ordering::Acquire)
  }

  pub async fn ensure(&self, probe: &dyn SchemaProbe) -> Result<()> {
    if self.is_verified() {
      return Ok(());
    }
    let missing = probe.missing_schema().await?;
    if !missing.is_empty() {
      error!(missing = ?missing, "Order intake schema is incomplete.");
      return Err(AppError::Config(format!("Missing schema objects: {}", missing.join(", "))));
    }
    // Concurrent first requests may both probe; either result is the same.
    if !self.verified.swap(true, Ordering::AcqRel) {
      info!("Order intake schema verified.");
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use async_trait::async_trait;
  use std::sync::atomic::AtomicUsize;

  struct CountingProbe {
    calls: AtomicUsize,
    missing: Vec<String>,
  }

  #[async_trait]
  impl SchemaProbe for CountingProbe {
    async fn missing_schema(&self) -> Result<Vec<String>> {
      self.calls.fetch_add(1, Ordering::SeqCst);
      Ok(self.missing.clone())
    }
  }

  #[tokio::test]
  async fn probes_once_after_success() {
    let guard = SchemaGuard::new();
    let probe = CountingProbe {
      calls: AtomicUsize::new(0),
      missing: vec![],
    };
    guard.ensure(&probe).await.unwrap();
    guard.ensure(&probe).await.unwrap();
    assert!(guard.is_verified());
    assert_eq!(probe.calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn failures_are_not_cached() {
    let guard = SchemaGuard::new();
    let probe = CountingProbe {
      calls: AtomicUsize::new(0),
      missing: vec!["orders.payment_id".to_string()],
    };
    assert!(matches!(guard.ensure(&probe).await, Err(AppError::Config(_))));
    assert!(guard.ensure(&probe).await.is_err());
    assert!(!guard.is_verified());
    assert_eq!(probe.calls.load(Ordering::SeqCst), 2);
  }
}
