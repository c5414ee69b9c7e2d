use sqlx::{PgExecutor, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{dto::AttendeeFilter, models::Attendee};

const ATTENDEE_COLUMNS: &str =
    "attendee_id, first_name, last_name, email, phone_number, event_id, check_in_status";

pub async fn create<'e, E>(attendee: &Attendee, executor: E) -> Result<u64, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let res = sqlx::query(
        "INSERT INTO attendees (attendee_id, first_name, last_name, email, phone_number, event_id, check_in_status)
        VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(attendee.attendee_id)
    .bind(&attendee.first_name)
    .bind(&attendee.last_name)
    .bind(&attendee.email)
    .bind(&attendee.phone_number)
    .bind(attendee.event_id)
    .bind(attendee.check_in_status)
    .execute(executor)
    .await?;
    Ok(res.rows_affected())
}

pub async fn get_by_id<'e, E>(id: Uuid, executor: E) -> Result<Option<Attendee>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Attendee>(&format!(
        "SELECT {ATTENDEE_COLUMNS} FROM attendees WHERE attendee_id = $1"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub async fn get_by_id_for_update<'e, E>(
    id: Uuid,
    executor: E,
) -> Result<Option<Attendee>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Attendee>(&format!(
        "SELECT {ATTENDEE_COLUMNS} FROM attendees WHERE attendee_id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub async fn exists_by_email<'e, E>(email: &str, executor: E) -> Result<bool, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM attendees WHERE email = $1)")
        .bind(email)
        .fetch_one(executor)
        .await
}

pub async fn count_for_event<'e, E>(event_id: Uuid, executor: E) -> Result<i64, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM attendees WHERE event_id = $1")
        .bind(event_id)
        .fetch_one(executor)
        .await
}

pub async fn filter<'e, E>(filter: &AttendeeFilter, executor: E) -> Result<Vec<Attendee>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let mut query_builder: QueryBuilder<Postgres> =
        QueryBuilder::new(format!("SELECT {ATTENDEE_COLUMNS} FROM attendees WHERE TRUE"));
    if let Some(event_id) = filter.event_id {
        query_builder.push(" AND event_id = ").push_bind(event_id);
    }
    if let Some(checked_in) = filter.check_in_status {
        query_builder.push(" AND check_in_status = ").push_bind(checked_in);
    }
    query_builder.push(" ORDER BY created_at, attendee_id");

    query_builder
        .build_query_as::<Attendee>()
        .fetch_all(executor)
        .await
}

pub async fn update<'e, E>(attendee: &Attendee, executor: E) -> Result<u64, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let res = sqlx::query(
        "UPDATE attendees
        SET first_name = $2, last_name = $3, email = $4, phone_number = $5, check_in_status = $6
        WHERE attendee_id = $1",
    )
    .bind(attendee.attendee_id)
    .bind(&attendee.first_name)
    .bind(&attendee.last_name)
    .bind(&attendee.email)
    .bind(&attendee.phone_number)
    .bind(attendee.check_in_status)
    .execute(executor)
    .await?;
    Ok(res.rows_affected())
}

pub async fn delete<'e, E>(id: Uuid, executor: E) -> Result<u64, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let res = sqlx::query("DELETE FROM attendees WHERE attendee_id = $1")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(res.rows_affected())
}

/// Locks and returns the attendees registered under any of `emails`.
pub async fn lock_by_emails<'e, E>(emails: &[String], executor: E) -> Result<Vec<Attendee>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Attendee>(&format!(
        "SELECT {ATTENDEE_COLUMNS} FROM attendees WHERE email = ANY($1) FOR UPDATE"
    ))
    .bind(emails)
    .fetch_all(executor)
    .await
}

/// Flips `check_in_status` to true for the given attendees. Rows that are
/// already checked in are left untouched and not counted.
pub async fn mark_checked_in<'e, E>(ids: &[Uuid], executor: E) -> Result<u64, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let res = sqlx::query(
        "UPDATE attendees SET check_in_status = TRUE
        WHERE attendee_id = ANY($1) AND check_in_status = FALSE",
    )
    .bind(ids)
    .execute(executor)
    .await?;
    Ok(res.rows_affected())
}
