// order_intake/src/web/handlers/health.rs

use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde_json::json;

/// Liveness plus whether the order schema has been verified in this process.
pub async fn health_check_handler(app_state: web::Data<AppState>) -> HttpResponse {
  HttpResponse::Ok().json(json!({
    "status": "ok",
    "schemaVerified": app_state.services.schema_guard.is_verified(),
  }))
}
