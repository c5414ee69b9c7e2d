use actix_web::{get, post, put, web, HttpResponse};
use uuid::Uuid;

use crate::{
   dto::{EventQuery, NewEventDto, UpdateEventDto},
   errors::ApiError,
   service, PGPool,
};

#[post("/")]
pub async fn create(
   new_event_dto: web::Json<NewEventDto>,
   pool_state: web::Data<PGPool>,
) -> Result<HttpResponse, ApiError> {
   let conn: &PGPool = pool_state.get_ref();
   let event = service::event::create(new_event_dto.into_inner(), conn).await?;
   Ok(HttpResponse::Created().json(event))
}

#[put("/{id}")]
pub async fn update(
   id: web::Path<Uuid>,
   update_event_dto: web::Json<UpdateEventDto>,
   pool_state: web::Data<PGPool>,
) -> Result<HttpResponse, ApiError> {
   let conn: &PGPool = pool_state.get_ref();
   let event = service::event::update(id.into_inner(), update_event_dto.into_inner(), conn).await?;
   Ok(HttpResponse::Ok().json(event))
}

#[get("/")]
pub async fn get_all(
   query: web::Query<EventQuery>,
   pool_state: web::Data<PGPool>,
) -> Result<HttpResponse, ApiError> {
   let conn: &PGPool = pool_state.get_ref();
   let events = service::event::list(query.into_inner(), conn).await?;
   Ok(HttpResponse::Ok().json(events))
}

#[get("/{id}")]
pub async fn get_by_id(
   id: web::Path<Uuid>,
   pool_state: web::Data<PGPool>,
) -> Result<HttpResponse, ApiError> {
   let conn: &PGPool = pool_state.get_ref();
   let event = service::event::get_by_id(id.into_inner(), conn).await?;
   Ok(HttpResponse::Ok().json(event))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
   cfg.service(create)
      .service(update)
      .service(get_all)
      .service(get_by_id);
}
