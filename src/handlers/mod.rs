pub mod attendee;
pub mod check_in;
pub mod event;

use actix_web::{error, get, web, HttpResponse};
use log::warn;
use serde_json::json;

use crate::{db, errors::ApiError, PGPool};

#[get("/health")]
pub async fn health(pool_state: web::Data<PGPool>) -> HttpResponse {
   match db::ping(pool_state.get_ref()).await {
      Ok(()) => HttpResponse::Ok().json(json!({ "status": "ok" })),
      Err(err) => {
         warn!("health check failed: {}", err);
         HttpResponse::ServiceUnavailable().json(json!({ "status": "unavailable" }))
      }
   }
}

fn bad_request(err: impl std::fmt::Display) -> error::Error {
   ApiError::Validation(err.to_string()).into()
}

/// Registers every route plus extractor configs that turn malformed JSON,
/// query strings and path segments into `VALIDATION_ERROR` responses.
pub fn configure(cfg: &mut web::ServiceConfig) {
   cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| bad_request(err)))
      .app_data(web::QueryConfig::default().error_handler(|err, _req| bad_request(err)))
      .app_data(web::PathConfig::default().error_handler(|err, _req| bad_request(err)))
      .service(health)
      .service(web::scope("/events").configure(event::init_routes))
      .service(
         web::scope("/attendees")
            .configure(check_in::init_routes)
            .configure(attendee::init_routes),
      );
}
