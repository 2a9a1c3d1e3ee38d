// order_intake/src/web/routes.rs

use crate::web::handlers::{health, orders};
use actix_web::web;

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg.service(
    web::scope("/api/v1")
      .route("/health", web::get().to(health::health_check_handler))
      .service(
        web::scope("/orders")
          .route("", web::post().to(orders::place_order_handler))
          .route("/{order_id}", web::get().to(orders::get_order_handler)),
      ),
  );
}
