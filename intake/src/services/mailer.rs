// order_intake/src/services/mailer.rs

use crate::errors::{AppError, Result};
use async_trait::async_trait;
use tracing::info;

#[derive(Debug, Clone)]
pub struct SentEmailInfo {
  pub to: String,
  pub subject: String,
  pub message_id: String,
}

/// Outbound mail. Delivery itself is owned by the mail provider.
#[async_trait]
pub trait Mailer: Send + Sync {
  async fn send(&self, to: &str, from: &str, subject: &str, html_body: &str) -> Result<SentEmailInfo>;
}

/// Writes mails to the log instead of delivering them.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
  async fn send(&self, to: &str, from: &str, subject: &str, html_body: &str) -> Result<SentEmailInfo> {
    if to.trim().is_empty() || !to.contains('@') {
      return Err(AppError::Validation(format!("Invalid recipient address '{}'", to)));
    }
    let body_preview = html_body.chars().take(50).collect::<String>();
    let message_id = format!("log_email_{}", uuid::Uuid::new_v4().simple());
    info!(%to, %from, %subject, %body_preview, %message_id, "Email logged instead of sent.");
    Ok(SentEmailInfo {
      to: to.to_string(),
      subject: subject.to_string(),
      message_id,
    })
  }
}
