use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    dto::EventFilter,
    errors::ApiError,
    models::{Event, EventStatus},
};

const EVENT_COLUMNS: &str =
    "event_id, name, description, start_time, end_time, location, max_attendees, status";

pub async fn create<'e, E>(event: &Event, executor: E) -> Result<u64, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let res = sqlx::query(
        "INSERT INTO events (event_id, name, description, start_time, end_time, location, max_attendees, status)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(event.event_id)
    .bind(&event.name)
    .bind(&event.description)
    .bind(event.start_time)
    .bind(event.end_time)
    .bind(&event.location)
    .bind(event.max_attendees)
    .bind(event.status)
    .execute(executor)
    .await?;
    Ok(res.rows_affected())
}

pub async fn get_by_id<'e, E>(id: Uuid, executor: E) -> Result<Option<Event>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Event>(&format!("SELECT {EVENT_COLUMNS} FROM events WHERE event_id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// Same as [`get_by_id`] but takes a row lock until the surrounding
/// transaction ends.
pub async fn get_by_id_for_update<'e, E>(id: Uuid, executor: E) -> Result<Option<Event>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Event>(&format!(
        "SELECT {EVENT_COLUMNS} FROM events WHERE event_id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}

/// Writes every mutable column of `event` back to its row.
pub async fn update<'e, E>(event: &Event, executor: E) -> Result<u64, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let res = sqlx::query(
        "UPDATE events
        SET name = $2, description = $3, start_time = $4, end_time = $5,
            location = $6, max_attendees = $7, status = $8
        WHERE event_id = $1",
    )
    .bind(event.event_id)
    .bind(&event.name)
    .bind(&event.description)
    .bind(event.start_time)
    .bind(event.end_time)
    .bind(&event.location)
    .bind(event.max_attendees)
    .bind(event.status)
    .execute(executor)
    .await?;
    Ok(res.rows_affected())
}

pub async fn set_status<'e, E>(id: Uuid, status: EventStatus, executor: E) -> Result<u64, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let res = sqlx::query("UPDATE events SET status = $2 WHERE event_id = $1")
        .bind(id)
        .bind(status)
        .execute(executor)
        .await?;
    Ok(res.rows_affected())
}

pub async fn filter<'e, E>(filter: &EventFilter, executor: E) -> Result<Vec<Event>, ApiError>
where
    E: PgExecutor<'e>,
{
    let mut query_builder: QueryBuilder<Postgres> =
        QueryBuilder::new(format!("SELECT {EVENT_COLUMNS} FROM events WHERE TRUE"));
    if let Some(status) = filter.status {
        query_builder.push(" AND status = ").push_bind(status);
    }
    if let Some(location) = &filter.location {
        query_builder
            .push(" AND location ILIKE ")
            .push_bind(format!("%{}%", escape_like(location)));
    }
    if let Some(date) = filter.date {
        let (from, to) = EventFilter::day_bounds(date)?;
        query_builder
            .push(" AND start_time >= ")
            .push_bind(from)
            .push(" AND start_time < ")
            .push_bind(to);
    }
    query_builder.push(" ORDER BY created_at, event_id");

    let events = query_builder
        .build_query_as::<Event>()
        .fetch_all(executor)
        .await?;
    Ok(events)
}

/// Completes every expired event that is not already COMPLETED or CANCELED.
/// Returns how many rows changed.
pub async fn complete_expired<'e, E>(now: DateTime<Utc>, executor: E) -> Result<u64, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let res = sqlx::query(
        "UPDATE events SET status = $1
        WHERE end_time < $2 AND status NOT IN ($1, $3)",
    )
    .bind(EventStatus::Completed)
    .bind(now)
    .bind(EventStatus::Canceled)
    .execute(executor)
    .await?;
    Ok(res.rows_affected())
}

/// Escapes LIKE metacharacters so user input matches literally.
fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
