use actix_multipart::Multipart;
use actix_web::{post, web, HttpResponse};
use futures_util::{StreamExt, TryStreamExt};
use log::info;
use uuid::Uuid;

use crate::{
   config::Settings,
   dto::{BulkCheckInResponse, CheckInResponse},
   errors::ApiError,
   service::{self, check_in},
   PGPool,
};

#[post("/check-in/{id}")]
pub async fn check_in_attendee(
   id: web::Path<Uuid>,
   pool_state: web::Data<PGPool>,
) -> Result<HttpResponse, ApiError> {
   let conn: &PGPool = pool_state.get_ref();
   let attendee_id = id.into_inner();
   let outcome = service::check_in::check_in(attendee_id, conn).await?;
   Ok(HttpResponse::Ok().json(CheckInResponse {
      message: outcome.message(attendee_id),
      attendee_id,
      check_in_status: true,
   }))
}

fn upload_error(err: actix_multipart::MultipartError) -> ApiError {
   ApiError::Validation(format!("Invalid upload: {}", err))
}

/// Reads the first file part of the form, enforcing the CSV extension and
/// the configured size limit before buffering it.
async fn read_csv_upload(mut payload: Multipart, limit: usize) -> Result<Vec<u8>, ApiError> {
   while let Some(mut field) = payload.try_next().await.map_err(upload_error)? {
      let file_name = field.content_disposition().get_filename().map(str::to_owned);
      if file_name.is_none() {
         continue;
      }
      check_in::ensure_csv_file_name(file_name.as_deref())?;

      let mut content = Vec::new();
      while let Some(chunk) = field.next().await {
         let chunk = chunk.map_err(upload_error)?;
         if content.len() + chunk.len() > limit {
            return Err(ApiError::Validation(format!(
               "Uploaded file exceeds the {} byte limit.",
               limit
            )));
         }
         content.extend_from_slice(&chunk);
      }
      return Ok(content);
   }
   Err(ApiError::Validation("No file was uploaded.".to_string()))
}

#[post("/bulk-check-in")]
pub async fn bulk_check_in(
   payload: Multipart,
   settings: web::Data<Settings>,
   pool_state: web::Data<PGPool>,
) -> Result<HttpResponse, ApiError> {
   let conn: &PGPool = pool_state.get_ref();
   let content = read_csv_upload(payload, settings.max_upload_bytes).await?;
   let emails = check_in::parse_emails(&content)?;
   info!("bulk check-in upload with {} distinct emails", emails.len());
   let count = service::check_in::bulk_check_in(&emails, conn).await?;
   Ok(HttpResponse::Ok().json(BulkCheckInResponse {
      message: format!("{} attendees successfully checked in.", count),
      checked_in: count,
   }))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
   cfg.service(check_in_attendee)
      .service(bulk_check_in);
}
