//! Single and bulk attendee check-in.
//!
//! Checking in is one-way and idempotent: an attendee who is already
//! checked in is reported as such by the single endpoint and silently
//! skipped by the CSV upload.

use std::collections::HashSet;

use log::{debug, info};
use uuid::Uuid;

use crate::{
    db,
    errors::{ApiError, ATTENDEE_NOT_FOUND},
    models::Attendee,
    PGPool,
};

pub const EMAIL_COLUMN: &str = "email";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckInOutcome {
    CheckedIn,
    AlreadyCheckedIn,
}

impl CheckInOutcome {
    pub fn message(&self, attendee_id: Uuid) -> String {
        match self {
            CheckInOutcome::CheckedIn => {
                format!("Attendee with ID {} has been checked in.", attendee_id)
            }
            CheckInOutcome::AlreadyCheckedIn => {
                format!("Attendee with ID {} is already checked in.", attendee_id)
            }
        }
    }
}

pub async fn check_in(id: Uuid, pool: &PGPool) -> Result<CheckInOutcome, ApiError> {
    let mut tx = pool.begin().await?;
    let attendee = db::attendee::get_by_id_for_update(id, &mut *tx)
        .await?
        .ok_or_else(|| ApiError::NotFound(ATTENDEE_NOT_FOUND.to_string()))?;
    if attendee.check_in_status {
        return Ok(CheckInOutcome::AlreadyCheckedIn);
    }
    db::attendee::mark_checked_in(&[attendee.attendee_id], &mut *tx).await?;
    tx.commit().await?;
    info!("attendee {} checked in", id);
    Ok(CheckInOutcome::CheckedIn)
}

/// Rejects uploads whose file name does not carry a `.csv` extension.
pub fn ensure_csv_file_name(file_name: Option<&str>) -> Result<(), ApiError> {
    match file_name {
        Some(name) if name.to_ascii_lowercase().ends_with(".csv") => Ok(()),
        _ => Err(ApiError::Validation(
            "Invalid file type. Only CSV files are allowed.".to_string(),
        )),
    }
}

/// Extracts the distinct, non-blank values of the `email` column, in file
/// order. The whole file is parsed before anything is written, so a
/// malformed row rejects the upload without side effects.
pub fn parse_emails(content: &[u8]) -> Result<Vec<String>, ApiError> {
    let text = std::str::from_utf8(content)
        .map_err(|_| ApiError::Validation("CSV file must be UTF-8 encoded.".to_string()))?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader.headers().map_err(malformed)?;
    let column = headers
        .iter()
        .position(|h| h == EMAIL_COLUMN)
        .ok_or_else(|| ApiError::Validation("CSV must contain an 'email' column.".to_string()))?;

    let mut seen = HashSet::new();
    let mut emails = Vec::new();
    for record in reader.records() {
        let record = record.map_err(malformed)?;
        match record.get(column) {
            Some(email) if !email.is_empty() => {
                if seen.insert(email.to_string()) {
                    emails.push(email.to_string());
                }
            }
            _ => continue,
        }
    }
    Ok(emails)
}

fn malformed(err: csv::Error) -> ApiError {
    ApiError::Validation(format!("Malformed CSV: {}", err))
}

/// Picks the attendees a bulk upload should flip: those not yet checked in.
pub fn pending_check_ins(attendees: &[Attendee]) -> Vec<Uuid> {
    attendees
        .iter()
        .filter(|a| !a.check_in_status)
        .map(|a| a.attendee_id)
        .collect()
}

/// Checks in every registered, not-yet-checked-in attendee whose email
/// appears in `emails`. Runs as one transaction; returns the number of
/// attendees newly checked in.
pub async fn bulk_check_in(emails: &[String], pool: &PGPool) -> Result<u64, ApiError> {
    if emails.is_empty() {
        return Ok(0);
    }
    let mut tx = pool.begin().await?;
    let registered = db::attendee::lock_by_emails(emails, &mut *tx).await?;
    let pending = pending_check_ins(&registered);
    debug!(
        "bulk check-in: {} rows, {} registered, {} pending",
        emails.len(),
        registered.len(),
        pending.len()
    );
    let count = if pending.is_empty() {
        0
    } else {
        db::attendee::mark_checked_in(&pending, &mut *tx).await?
    };
    tx.commit().await?;
    info!("bulk check-in completed: {} attendees checked in", count);
    Ok(count)
}
