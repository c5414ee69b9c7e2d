use log::info;
use uuid::Uuid;

use crate::{
    db,
    dto::{AttendeeFilter, NewAttendeeDto, UpdateAttendeeDto},
    errors::{ApiError, ATTENDEE_NOT_FOUND, EVENT_NOT_FOUND},
    models::Attendee,
    PGPool,
};

/// Fails once an event already holds `max_attendees` registrations.
pub fn ensure_capacity(registered: i64, max_attendees: i32) -> Result<(), ApiError> {
    if registered >= i64::from(max_attendees) {
        Err(ApiError::Validation(
            "Registration limit reached for this event.".to_string(),
        ))
    } else {
        Ok(())
    }
}

fn duplicate_email(email: &str) -> ApiError {
    ApiError::Duplicate(format!("Attendee with email '{}' already exists.", email))
}

/// Registers an attendee. The event row stays locked for the whole
/// transaction so concurrent registrations cannot overshoot its capacity.
pub async fn create(dto: NewAttendeeDto, pool: &PGPool) -> Result<Attendee, ApiError> {
    dto.validate()?;
    let attendee = dto.into_attendee(Uuid::new_v4());

    let mut tx = pool.begin().await?;
    let event = db::event::get_by_id_for_update(attendee.event_id, &mut *tx)
        .await?
        .ok_or_else(|| ApiError::NotFound(EVENT_NOT_FOUND.to_string()))?;
    if db::attendee::exists_by_email(&attendee.email, &mut *tx).await? {
        return Err(duplicate_email(&attendee.email));
    }
    let registered = db::attendee::count_for_event(event.event_id, &mut *tx).await?;
    ensure_capacity(registered, event.max_attendees)?;

    db::attendee::create(&attendee, &mut *tx).await?;
    tx.commit().await?;
    info!(
        "attendee {} registered for event {} ({}/{})",
        attendee.attendee_id,
        event.event_id,
        registered + 1,
        event.max_attendees
    );
    Ok(attendee)
}

pub async fn update(id: Uuid, dto: UpdateAttendeeDto, pool: &PGPool) -> Result<Attendee, ApiError> {
    let mut tx = pool.begin().await?;
    let mut attendee = db::attendee::get_by_id_for_update(id, &mut *tx)
        .await?
        .ok_or_else(|| ApiError::NotFound(ATTENDEE_NOT_FOUND.to_string()))?;
    let previous_email = attendee.email.clone();
    dto.apply(&mut attendee)?;
    if attendee.email != previous_email
        && db::attendee::exists_by_email(&attendee.email, &mut *tx).await?
    {
        return Err(duplicate_email(&attendee.email));
    }
    db::attendee::update(&attendee, &mut *tx).await?;
    tx.commit().await?;
    info!("attendee {} updated", id);
    Ok(attendee)
}

pub async fn list(filter: AttendeeFilter, pool: &PGPool) -> Result<Vec<Attendee>, ApiError> {
    Ok(db::attendee::filter(&filter, pool).await?)
}

pub async fn get_by_id(id: Uuid, pool: &PGPool) -> Result<Attendee, ApiError> {
    db::attendee::get_by_id(id, pool)
        .await?
        .ok_or_else(|| ApiError::NotFound(ATTENDEE_NOT_FOUND.to_string()))
}

pub async fn delete(id: Uuid, pool: &PGPool) -> Result<(), ApiError> {
    match db::attendee::delete(id, pool).await? {
        0 => Err(ApiError::NotFound(ATTENDEE_NOT_FOUND.to_string())),
        _ => {
            info!("attendee {} deleted", id);
            Ok(())
        }
    }
}
