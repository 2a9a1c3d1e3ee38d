// order_intake/src/services/audit.rs

use crate::errors::Result;
use async_trait::async_trait;
use sqlx::PgPool;

/// Order activity trail. Fire-and-forget from the pipeline's point of view.
#[async_trait]
pub trait AuditLogger: Send + Sync {
  async fn log_order_activity(&self, order_id: &str, event_type: &str, message: &str, actor: &str) -> Result<()>;
}

pub struct PgAuditLogger {
  pool: PgPool,
}

impl PgAuditLogger {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }
}

#[async_trait]
impl AuditLogger for PgAuditLogger {
  async fn log_order_activity(&self, order_id: &str, event_type: &str, message: &str, actor: &str) -> Result<()> {
    sqlx::query(
      r#"
      INSERT INTO order_activity_log (order_id, event_type, message, actor, created_at)
      VALUES ($1, $2, $3, $4, NOW())
      "#,
    )
    .bind(order_id)
    .bind(event_type)
    .bind(message)
    .bind(actor)
    .execute(&self.pool)
    .await?;
    Ok(())
  }
}

/// Writes audit entries to the tracing output only.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditLogger;

#[async_trait]
impl AuditLogger for TracingAuditLogger {
  async fn log_order_activity(&self, order_id: &str, event_type: &str, message: &str, actor: &str) -> Result<()> {
    tracing::info!(target: "order_audit", order_id, event_type, message, actor, "Order activity.");
    Ok(())
  }
}
