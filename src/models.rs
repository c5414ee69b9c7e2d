use std::{fmt, str::FromStr};

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

use crate::errors::ApiError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "event_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum EventStatus {
    #[default]
    #[serde(alias = "scheduled")]
    Scheduled,
    #[serde(alias = "ongoing")]
    Ongoing,
    #[serde(alias = "completed")]
    Completed,
    #[serde(alias = "canceled")]
    Canceled,
}

impl EventStatus {
    pub const ALL: [EventStatus; 4] = [
        EventStatus::Scheduled,
        EventStatus::Ongoing,
        EventStatus::Completed,
        EventStatus::Canceled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Scheduled => "SCHEDULED",
            EventStatus::Ongoing => "ONGOING",
            EventStatus::Completed => "COMPLETED",
            EventStatus::Canceled => "CANCELED",
        }
    }

    /// Statuses the clock never moves an event out of.
    pub fn is_terminal(&self) -> bool {
        matches!(self, EventStatus::Completed | EventStatus::Canceled)
    }

    /// Returns the status an event should move to given its end time, or
    /// `None` when nothing changes. Only COMPLETED is ever derived, and only
    /// once `end_time` is strictly in the past.
    pub fn derive(self, end_time: DateTime<Utc>, now: DateTime<Utc>) -> Option<EventStatus> {
        if end_time < now && !self.is_terminal() {
            Some(EventStatus::Completed)
        } else {
            None
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventStatus {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        EventStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ApiError::Validation("Invalid status value".to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Event {
    pub event_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub location: String,
    pub max_attendees: i32,
    pub status: EventStatus,
}

/// Drops sub-microsecond digits, the finest resolution Postgres keeps.
pub fn to_storage_precision(at: DateTime<Utc>) -> DateTime<Utc> {
    at.trunc_subsecs(6)
}

impl Event {
    /// Checks the invariants every stored event must hold.
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.name.trim().is_empty() {
            return Err(ApiError::Validation("Event name must not be empty".to_string()));
        }
        if self.location.trim().is_empty() {
            return Err(ApiError::Validation("Event location must not be empty".to_string()));
        }
        if self.start_time >= self.end_time {
            return Err(ApiError::Validation("Start time must be before end time".to_string()));
        }
        if self.max_attendees <= 0 {
            return Err(ApiError::Validation(format!(
                "Maximum attendees can't be {}",
                self.max_attendees
            )));
        }
        Ok(())
    }

    /// Applies [`EventStatus::derive`] in place. Returns `true` when the
    /// status changed and the row needs to be written back.
    pub fn derive_status(&mut self, now: DateTime<Utc>) -> bool {
        match self.status.derive(self.end_time, now) {
            Some(next) => {
                self.status = next;
                true
            }
            None => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Attendee {
    pub attendee_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub event_id: Uuid,
    pub check_in_status: bool,
}
