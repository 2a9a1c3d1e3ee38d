// order_intake/src/services/payment.rs

//! Payment capture boundary.
//!
//! The pipeline captures before it writes the order, so every capture must
//! be undoable: [`PaymentGateway`] is `{capture, compensate}` plus an
//! idempotent status lookup used when a capture's outcome is unknown.

use crate::errors::{AppError, Result};
use crate::pricing::money::{from_minor_units, to_minor_units};
use crate::services::secrets::{SecretStore, PAYMENT_API_KEY};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

/// Outcome of a successful capture. Its only durable trace is the payment
/// id stored on the order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResult {
  pub transaction_id: String,
  pub amount: Decimal,
  pub success: bool,
}

#[derive(Debug, Clone)]
pub struct CaptureRequest {
  /// Order id; lets the processor answer status lookups for this capture.
  pub reference: String,
  pub amount: Decimal,
  pub currency: String,
  pub token: String,
}

/// What the processor knows about a capture reference.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureStatus {
  Captured(PaymentResult),
  Declined(String),
  NotFound,
}

#[derive(Debug, Error)]
pub enum GatewayError {
  /// Final answer from the processor; nothing was captured.
  #[error("declined: {0}")]
  Declined(String),
  /// Rejected request (bad token or payload); nothing was captured.
  #[error("malformed request: {0}")]
  Malformed(String),
  /// No answer in time. The capture may or may not have happened.
  #[error("timed out: {0}")]
  Timeout(String),
  /// Transport or processor-side failure. The outcome is unknown.
  #[error("unavailable: {0}")]
  Unavailable(String),
  #[error("status lookup not supported")]
  StatusUnsupported,
  #[error("payment processor not configured")]
  NotConfigured,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
  async fn capture(&self, request: &CaptureRequest) -> std::result::Result<PaymentResult, GatewayError>;

  /// Refunds or voids a capture made by this gateway.
  async fn compensate(&self, payment: &PaymentResult) -> std::result::Result<(), GatewayError>;

  async fn status(&self, reference: &str) -> std::result::Result<CaptureStatus, GatewayError>;
}

// --- HTTP processor ---

#[derive(Serialize)]
struct CaptureBody<'a> {
  reference: &'a str,
  amount_minor: i64,
  currency: &'a str,
  token: &'a str,
}

#[derive(Deserialize)]
struct ProcessorReply {
  #[serde(default)]
  id: Option<String>,
  status: String,
  #[serde(default)]
  amount_minor: Option<i64>,
  #[serde(default)]
  message: Option<String>,
}

/// Client for the shop's payment processor.
pub struct HttpPaymentProcessor {
  client: reqwest::Client,
  base_url: String,
  api_key: Option<String>,
}

fn transport_error(err: reqwest::Error) -> GatewayError {
  if err.is_timeout() {
    GatewayError::Timeout(err.to_string())
  } else {
    GatewayError::Unavailable(err.to_string())
  }
}

impl HttpPaymentProcessor {
  pub fn new(base_url: &str, timeout: Duration, secrets: &dyn SecretStore) -> Result<Self> {
    let client = reqwest::Client::builder().timeout(timeout).build()?;
    let api_key = secrets.secret(PAYMENT_API_KEY)?;
    if api_key.is_none() {
      warn!("No payment processor API key configured; requests are sent unauthenticated.");
    }
    Ok(Self {
      client,
      base_url: base_url.trim_end_matches('/').to_string(),
      api_key,
    })
  }

  fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
    match &self.api_key {
      Some(key) => builder.bearer_auth(key),
      None => builder,
    }
  }

  async fn read_reply(response: reqwest::Response) -> std::result::Result<ProcessorReply, GatewayError> {
    let status = response.status();
    if status.is_server_error() {
      return Err(GatewayError::Unavailable(format!("processor answered {}", status)));
    }
    let reply = response.json::<ProcessorReply>().await.map_err(transport_error);
    match reply {
      Ok(reply) => Ok(reply),
      Err(_) if status.is_client_error() => Err(GatewayError::Malformed(format!("processor answered {}", status))),
      Err(e) => Err(e),
    }
  }
}

#[async_trait]
impl PaymentGateway for HttpPaymentProcessor {
  #[instrument(name = "processor::capture", skip(self, request), fields(reference = %request.reference, amount = %request.amount))]
  async fn capture(&self, request: &CaptureRequest) -> std::result::Result<PaymentResult, GatewayError> {
    let amount_minor = to_minor_units(request.amount).map_err(|e| GatewayError::Malformed(e.to_string()))?;
    let body = CaptureBody {
      reference: &request.reference,
      amount_minor,
      currency: &request.currency,
      token: &request.token,
    };
    let response = self
      .authorized(self.client.post(format!("{}/captures", self.base_url)))
      .json(&body)
      .send()
      .await
      .map_err(transport_error)?;
    let reply = Self::read_reply(response).await?;

    match (reply.status.as_str(), reply.id) {
      ("captured", Some(id)) => {
        let amount = reply.amount_minor.map(from_minor_units).unwrap_or(request.amount);
        info!(transaction_id = %id, %amount, "Capture confirmed by processor.");
        Ok(PaymentResult {
          transaction_id: id,
          amount,
          success: true,
        })
      }
      ("declined", _) => Err(GatewayError::Declined(
        reply.message.unwrap_or_else(|| "card declined".to_string()),
      )),
      (other, _) => Err(GatewayError::Malformed(format!("unexpected capture status '{}'", other))),
    }
  }

  #[instrument(name = "processor::void", skip(self, payment), fields(transaction_id = %payment.transaction_id))]
  async fn compensate(&self, payment: &PaymentResult) -> std::result::Result<(), GatewayError> {
    let response = self
      .authorized(
        self
          .client
          .post(format!("{}/captures/{}/void", self.base_url, payment.transaction_id)),
      )
      .send()
      .await
      .map_err(transport_error)?;
    let status = response.status();
    if status.is_success() {
      Ok(())
    } else if status.is_server_error() {
      Err(GatewayError::Unavailable(format!("void answered {}", status)))
    } else {
      Err(GatewayError::Declined(format!("void rejected with {}", status)))
    }
  }

  #[instrument(name = "processor::status", skip(self))]
  async fn status(&self, reference: &str) -> std::result::Result<CaptureStatus, GatewayError> {
    let response = self
      .authorized(self.client.get(format!("{}/captures", self.base_url)))
      .query(&[("reference", reference)])
      .send()
      .await
      .map_err(transport_error)?;
    let reply = Self::read_reply(response).await?;
    match (reply.status.as_str(), reply.id) {
      ("captured", Some(id)) => Ok(CaptureStatus::Captured(PaymentResult {
        transaction_id: id,
        amount: reply.amount_minor.map(from_minor_units).unwrap_or_default(),
        success: true,
      })),
      ("declined", _) => Ok(CaptureStatus::Declined(reply.message.unwrap_or_default())),
      ("not_found", _) => Ok(CaptureStatus::NotFound),
      (other, _) => Err(GatewayError::Malformed(format!("unexpected status '{}'", other))),
    }
  }
}

/// Stands in when no processor URL is configured; every call fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfiguredGateway;

#[async_trait]
impl PaymentGateway for UnconfiguredGateway {
  async fn capture(&self, _request: &CaptureRequest) -> std::result::Result<PaymentResult, GatewayError> {
    Err(GatewayError::NotConfigured)
  }

  async fn compensate(&self, _payment: &PaymentResult) -> std::result::Result<(), GatewayError> {
    Err(GatewayError::NotConfigured)
  }

  async fn status(&self, _reference: &str) -> std::result::Result<CaptureStatus, GatewayError> {
    Err(GatewayError::NotConfigured)
  }
}

// --- Capture policy ---

/// Applies the capture policy on top of a gateway: declines are final,
/// unknown outcomes are resolved through the status lookup, and anything
/// still unknown fails closed as [`AppError::PaymentUnavailable`].
#[derive(Clone)]
pub struct PaymentCaptureAdapter {
  gateway: Arc<dyn PaymentGateway>,
  status_check: bool,
}

impl PaymentCaptureAdapter {
  pub fn new(gateway: Arc<dyn PaymentGateway>, status_check: bool) -> Self {
    Self { gateway, status_check }
  }

  #[instrument(name = "payment::capture", skip(self, request), fields(reference = %request.reference))]
  pub async fn capture(&self, request: &CaptureRequest) -> Result<PaymentResult> {
    if request.token.trim().is_empty() {
      return Err(AppError::PaymentDeclined("A payment token is required.".to_string()));
    }
    if request.amount <= Decimal::ZERO {
      return Err(AppError::Validation(format!("Cannot capture a non-positive amount: {}", request.amount)));
    }

    match self.gateway.capture(request).await {
      Ok(result) if result.success => Ok(result),
      Ok(_) => Err(AppError::PaymentDeclined("The payment was not approved.".to_string())),
      Err(GatewayError::Declined(reason)) | Err(GatewayError::Malformed(reason)) => {
        info!(%reason, "Capture declined.");
        Err(AppError::PaymentDeclined(reason))
      }
      Err(GatewayError::NotConfigured) => Err(AppError::Config(
        "Card payments are not available: no payment processor is configured.".to_string(),
      )),
      Err(unknown) => {
        warn!(error = %unknown, "Capture outcome unknown; consulting processor status.");
        self.resolve_unknown(request, unknown).await
      }
    }
  }

  async fn resolve_unknown(&self, request: &CaptureRequest, cause: GatewayError) -> Result<PaymentResult> {
    if !self.status_check {
      return Err(AppError::PaymentUnavailable(format!(
        "{}; status lookup disabled, manual reconciliation required",
        cause
      )));
    }
    match self.gateway.status(&request.reference).await {
      Ok(CaptureStatus::Captured(mut result)) => {
        if result.amount.is_zero() {
          result.amount = request.amount;
        }
        info!(transaction_id = %result.transaction_id, "Status lookup confirmed the capture.");
        Ok(result)
      }
      Ok(CaptureStatus::Declined(reason)) => Err(AppError::PaymentDeclined(reason)),
      Ok(CaptureStatus::NotFound) => Err(AppError::PaymentDeclined(format!(
        "The payment did not go through ({}).",
        cause
      ))),
      Err(status_err) => {
        error!(capture_error = %cause, status_error = %status_err, "Capture outcome could not be determined.");
        Err(AppError::PaymentUnavailable(format!(
          "{}; status lookup failed: {}",
          cause, status_err
        )))
      }
    }
  }

  /// Undoes `payment`. Errors are returned for the caller to escalate.
  #[instrument(name = "payment::compensate", skip(self, payment), fields(transaction_id = %payment.transaction_id))]
  pub async fn compensate(&self, payment: &PaymentResult) -> Result<()> {
    self.gateway.compensate(payment).await.map_err(|e| match e {
      GatewayError::NotConfigured => AppError::Config("payment processor not configured".to_string()),
      other => AppError::Internal(format!("refund of {} failed: {}", payment.transaction_id, other)),
    })
  }
}
