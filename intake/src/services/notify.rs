// order_intake/src/services/notify.rs

use crate::errors::{AppError, Result};
use crate::services::mailer::Mailer;
use crate::store::OrderStore;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::{instrument, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationReport {
  pub customer_sent: bool,
  pub admin_sent: bool,
}

/// Post-commit order notifications. Best effort: callers log failures and
/// never roll an order back because of them.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
  async fn notify_order_created(&self, order_id: &str) -> Result<NotificationReport>;
}

/// Mails the buyer (when the order carries an address) and the shop.
pub struct EmailNotifier {
  orders: Arc<dyn OrderStore>,
  mailer: Arc<dyn Mailer>,
  sender: String,
  admin_email: String,
}

impl EmailNotifier {
  pub fn new(orders: Arc<dyn OrderStore>, mailer: Arc<dyn Mailer>, sender: String, admin_email: String) -> Self {
    Self {
      orders,
      mailer,
      sender,
      admin_email,
    }
  }
}

#[async_trait]
impl NotificationDispatcher for EmailNotifier {
  #[instrument(name = "notify::order_created", skip(self))]
  async fn notify_order_created(&self, order_id: &str) -> Result<NotificationReport> {
    let (order, lines) = self
      .orders
      .find_order(order_id)
      .await?
      .ok_or_else(|| AppError::NotFound(format!("Order {} not found for notification", order_id)))?;

    let items_html: String = lines
      .iter()
      .map(|line| format!("<li>{} x {} @ ${}</li>", line.quantity, line.item_name, line.unit_price))
      .collect();
    let mut report = NotificationReport::default();

    if let Some(customer_email) = order.shipping_address.email.as_deref() {
      let greeting = order.shipping_address.name.as_deref().unwrap_or("Valued Customer");
      let subject = format!("Your order #{} is confirmed", order.id);
      let body = format!(
        "<p>Hi {},</p><p>We received order #{} totalling ${}.</p><ul>{}</ul>",
        greeting, order.id, order.total_amount, items_html
      );
      match self.mailer.send(customer_email, &self.sender, &subject, &body).await {
        Ok(_) => report.customer_sent = true,
        Err(e) => warn!(order_id, error = %e, "Customer confirmation email failed."),
      }
    }

    let subject = format!("New order #{} ({})", order.id, order.payment_method);
    let body = format!(
      "<p>Order #{} by {} via {}: ${}.</p><ul>{}</ul>",
      order.id, order.user_id, order.shipping_method, order.total_amount, items_html
    );
    match self.mailer.send(&self.admin_email, &self.sender, &subject, &body).await {
      Ok(_) => report.admin_sent = true,
      Err(e) => warn!(order_id, error = %e, "Admin order email failed."),
    }

    Ok(report)
  }
}
