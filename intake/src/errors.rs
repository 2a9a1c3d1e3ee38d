// order_intake/src/errors.rs

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use stepflow::FlowError;
use thiserror::Error;

/// Machine-readable failure category returned to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
  Validation,
  InsufficientStock,
  PaymentDeclined,
  Unauthorized,
  NotFound,
  ServerError,
}

impl ErrorCategory {
  pub fn as_str(&self) -> &'static str {
    match self {
      ErrorCategory::Validation => "validation",
      ErrorCategory::InsufficientStock => "insufficient_stock",
      ErrorCategory::PaymentDeclined => "payment_declined",
      ErrorCategory::Unauthorized => "unauthorized",
      ErrorCategory::NotFound => "not_found",
      ErrorCategory::ServerError => "server_error",
    }
  }
}

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Validation Error: {0}")]
  Validation(String),

  #[error("Insufficient stock for {item_name}{}: requested {requested}, available {available}", variant_label(.color, .size))]
  InsufficientStock {
    item_name: String,
    requested: i32,
    available: i32,
    color: Option<String>,
    size: Option<String>,
  },

  #[error("Payment failed: {0}")]
  PaymentDeclined(String),

  /// The processor could not be reached and its status could not be
  /// confirmed. Nothing is retried automatically.
  #[error("Payment could not be confirmed: {0}")]
  PaymentUnavailable(String),

  #[error("Order already submitted with idempotency key '{0}'")]
  DuplicateSubmission(String),

  #[error("Authentication Failed: {0}")]
  Auth(String),

  #[error("Resource Not Found: {0}")]
  NotFound(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Database Error: {0}")]
  Sqlx(#[from] sqlx::Error),

  #[error("Payment processor transport error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("Workflow Error: {source}")]
  Workflow {
    #[from]
    source: FlowError,
  },

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

fn variant_label(color: &Option<String>, size: &Option<String>) -> String {
  match (color, size) {
    (None, None) => String::new(),
    (Some(c), None) => format!(" ({})", c),
    (None, Some(s)) => format!(" ({})", s),
    (Some(c), Some(s)) => format!(" ({} / {})", c, s),
  }
}

impl AppError {
  pub fn category(&self) -> ErrorCategory {
    match self {
      AppError::Validation(_) => ErrorCategory::Validation,
      AppError::InsufficientStock { .. } => ErrorCategory::InsufficientStock,
      AppError::PaymentDeclined(_) | AppError::PaymentUnavailable(_) => ErrorCategory::PaymentDeclined,
      AppError::Auth(_) => ErrorCategory::Unauthorized,
      AppError::NotFound(_) => ErrorCategory::NotFound,
      AppError::DuplicateSubmission(_)
      | AppError::Config(_)
      | AppError::Sqlx(_)
      | AppError::Http(_)
      | AppError::Workflow { .. }
      | AppError::Internal(_) => ErrorCategory::ServerError,
    }
  }

  /// Message safe to show the buyer. Infrastructure details stay in the logs.
  pub fn public_message(&self) -> String {
    match self {
      AppError::Sqlx(_) => "The order could not be saved. No payment was kept.".to_string(),
      AppError::Http(_) | AppError::Workflow { .. } | AppError::Internal(_) | AppError::Config(_) => {
        "The order could not be processed due to a server error.".to_string()
      }
      other => other.to_string(),
    }
  }
}

impl From<anyhow::Error> for AppError {
  fn from(err: anyhow::Error) -> Self {
    match err.downcast::<sqlx::Error>() {
      Ok(db_err) => AppError::Sqlx(db_err),
      Err(err) => AppError::Internal(err.to_string()),
    }
  }
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self.category() {
      ErrorCategory::Validation => StatusCode::BAD_REQUEST,
      ErrorCategory::InsufficientStock => StatusCode::CONFLICT,
      ErrorCategory::PaymentDeclined => StatusCode::PAYMENT_REQUIRED,
      ErrorCategory::Unauthorized => StatusCode::UNAUTHORIZED,
      ErrorCategory::NotFound => StatusCode::NOT_FOUND,
      ErrorCategory::ServerError => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  fn error_response(&self) -> HttpResponse {
    tracing::error!(application_error = %self, category = self.category().as_str(), "Responding with error");
    let mut body = json!({
      "category": self.category().as_str(),
      "error": self.public_message(),
    });
    if let AppError::InsufficientStock {
      item_name,
      requested,
      available,
      color,
      size,
    } = self
    {
      body["detail"] = json!({
        "itemName": item_name,
        "requested": requested,
        "available": available,
        "color": color,
        "size": size,
      });
    }
    HttpResponse::build(self.status_code()).json(body)
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
