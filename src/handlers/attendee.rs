use actix_web::{delete, get, post, put, web, HttpResponse};
use uuid::Uuid;

use crate::{
   dto::{AttendeeFilter, MessageResponse, NewAttendeeDto, UpdateAttendeeDto},
   errors::ApiError,
   service, PGPool,
};

#[post("/")]
pub async fn create(
   dto: web::Json<NewAttendeeDto>,
   pool_state: web::Data<PGPool>,
) -> Result<HttpResponse, ApiError> {
   let conn: &PGPool = pool_state.get_ref();
   let attendee = service::attendee::create(dto.into_inner(), conn).await?;
   Ok(HttpResponse::Created().json(attendee))
}

#[put("/{id}")]
pub async fn update(
   id: web::Path<Uuid>,
   dto: web::Json<UpdateAttendeeDto>,
   pool_state: web::Data<PGPool>,
) -> Result<HttpResponse, ApiError> {
   let conn: &PGPool = pool_state.get_ref();
   let attendee = service::attendee::update(id.into_inner(), dto.into_inner(), conn).await?;
   Ok(HttpResponse::Ok().json(attendee))
}

#[get("/")]
pub async fn get_all(
   filter: web::Query<AttendeeFilter>,
   pool_state: web::Data<PGPool>,
) -> Result<HttpResponse, ApiError> {
   let conn: &PGPool = pool_state.get_ref();
   let attendees = service::attendee::list(filter.into_inner(), conn).await?;
   Ok(HttpResponse::Ok().json(attendees))
}

#[get("/{id}")]
pub async fn get_by_id(
   id: web::Path<Uuid>,
   pool_state: web::Data<PGPool>,
) -> Result<HttpResponse, ApiError> {
   let conn: &PGPool = pool_state.get_ref();
   let attendee = service::attendee::get_by_id(id.into_inner(), conn).await?;
   Ok(HttpResponse::Ok().json(attendee))
}

#[delete("/{id}")]
pub async fn remove(
   id: web::Path<Uuid>,
   pool_state: web::Data<PGPool>,
) -> Result<HttpResponse, ApiError> {
   let conn: &PGPool = pool_state.get_ref();
   service::attendee::delete(id.into_inner(), conn).await?;
   Ok(HttpResponse::Ok().json(MessageResponse {
      message: "Attendee deleted successfully".to_string(),
   }))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
   cfg.service(create)
      .service(update)
      .service(get_all)
      .service(get_by_id)
      .service(remove);
}
