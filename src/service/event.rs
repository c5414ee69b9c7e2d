use chrono::Utc;
use log::info;
use uuid::Uuid;

use crate::{
    db,
    dto::{EventQuery, NewEventDto, UpdateEventDto},
    errors::{ApiError, EVENT_NOT_FOUND},
    models::Event,
    PGPool,
};

pub async fn create(dto: NewEventDto, pool: &PGPool) -> Result<Event, ApiError> {
    let event = dto.into_event(Uuid::new_v4());
    event.validate()?;
    db::event::create(&event, pool).await?;
    info!("event {} created ({})", event.event_id, event.name);
    Ok(event)
}

pub async fn update(id: Uuid, dto: UpdateEventDto, pool: &PGPool) -> Result<Event, ApiError> {
    let mut tx = pool.begin().await?;
    let mut event = db::event::get_by_id_for_update(id, &mut *tx)
        .await?
        .ok_or_else(|| ApiError::NotFound(EVENT_NOT_FOUND.to_string()))?;
    dto.apply(&mut event);
    event.validate()?;
    db::event::update(&event, &mut *tx).await?;
    tx.commit().await?;
    info!("event {} updated", id);
    Ok(event)
}

pub async fn list(query: EventQuery, pool: &PGPool) -> Result<Vec<Event>, ApiError> {
    let filter = query.into_filter()?;
    db::event::filter(&filter, pool).await
}

/// Fetches an event and completes it first if its end time has passed.
pub async fn get_by_id(id: Uuid, pool: &PGPool) -> Result<Event, ApiError> {
    let mut tx = pool.begin().await?;
    let mut event = db::event::get_by_id_for_update(id, &mut *tx)
        .await?
        .ok_or_else(|| ApiError::NotFound(EVENT_NOT_FOUND.to_string()))?;
    if event.derive_status(Utc::now()) {
        db::event::set_status(event.event_id, event.status, &mut *tx).await?;
        info!("event {} marked {} on read", event.event_id, event.status);
    }
    tx.commit().await?;
    Ok(event)
}
