// order_intake/src/web/extractors.rs

use crate::errors::AppError;
use actix_web::{FromRequest, HttpRequest};
use futures_util::future::{ready, Ready};
use tracing::warn;

pub const USER_ID_HEADER: &str = "X-User-ID";
pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

/// The acting user, as established by the auth layer in front of this
/// service and forwarded in `X-User-ID`.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
  pub user_id: String,
}

impl FromRequest for AuthenticatedUser {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
    let user_id = req
      .headers()
      .get(USER_ID_HEADER)
      .and_then(|value| value.to_str().ok())
      .map(str::trim)
      .filter(|value| !value.is_empty());
    match user_id {
      Some(user_id) => ready(Ok(AuthenticatedUser {
        user_id: user_id.to_string(),
      })),
      None => {
        warn!("Missing or invalid {} header.", USER_ID_HEADER);
        ready(Err(AppError::Auth(format!(
          "User authentication required: missing {} header.",
          USER_ID_HEADER
        ))))
      }
    }
  }
}

/// `Idempotency-Key` header value, if present and non-blank.
pub fn idempotency_key_header(req: &HttpRequest) -> Option<String> {
  req
    .headers()
    .get(IDEMPOTENCY_KEY_HEADER)
    .and_then(|value| value.to_str().ok())
    .map(str::trim)
    .filter(|value| !value.is_empty())
    .map(str::to_string)
}
