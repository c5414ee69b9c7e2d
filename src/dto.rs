use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::{
    errors::ApiError,
    models::{to_storage_precision, Attendee, Event, EventStatus},
};

/// Keeps `null` distinct from an absent field: absent is `None`,
/// `null` is `Some(None)`.
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct NewEventDto {
    pub name: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub location: String,
    pub max_attendees: i32,
    pub status: Option<EventStatus>,
}

impl NewEventDto {
    pub fn into_event(self, event_id: Uuid) -> Event {
        Event {
            event_id,
            name: self.name,
            description: self.description,
            start_time: to_storage_precision(self.start_time),
            end_time: to_storage_precision(self.end_time),
            location: self.location,
            max_attendees: self.max_attendees,
            status: self.status.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize, Clone)]
pub struct UpdateEventDto {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub max_attendees: Option<i32>,
    pub status: Option<EventStatus>,
}

impl UpdateEventDto {
    /// Overwrites the fields present in the update; absent fields stay as
    /// they are. `"description": null` clears the description.
    pub fn apply(self, event: &mut Event) {
        if let Some(v) = self.name {
            event.name = v;
        }
        if let Some(v) = self.description {
            event.description = v;
        }
        if let Some(v) = self.start_time {
            event.start_time = to_storage_precision(v);
        }
        if let Some(v) = self.end_time {
            event.end_time = to_storage_precision(v);
        }
        if let Some(v) = self.location {
            event.location = v;
        }
        if let Some(v) = self.max_attendees {
            event.max_attendees = v;
        }
        if let Some(v) = self.status {
            event.status = v;
        }
    }
}

/// Raw query string of `GET /events/`.
#[derive(Debug, Default, Deserialize, Clone)]
pub struct EventQuery {
    pub status: Option<String>,
    pub location: Option<String>,
    pub date: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct EventFilter {
    pub status: Option<EventStatus>,
    pub location: Option<String>,
    pub date: Option<NaiveDate>,
}

impl EventQuery {
    pub fn into_filter(self) -> Result<EventFilter, ApiError> {
        let status = match non_blank(self.status) {
            Some(raw) => Some(raw.parse::<EventStatus>()?),
            None => None,
        };
        let date = match non_blank(self.date) {
            Some(raw) => Some(parse_calendar_date(&raw)?),
            None => None,
        };
        Ok(EventFilter {
            status,
            location: non_blank(self.location),
            date,
        })
    }
}

impl EventFilter {
    /// Half-open UTC range `[midnight, next midnight)` covering `date`.
    pub fn day_bounds(date: NaiveDate) -> Result<(DateTime<Utc>, DateTime<Utc>), ApiError> {
        let start = date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| ApiError::Validation("Invalid date value".to_string()))?;
        let start = DateTime::<Utc>::from_naive_utc_and_offset(start, Utc);
        Ok((start, start + Duration::days(1)))
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Accepts `YYYY-MM-DD`, an RFC 3339 timestamp, or a naive `YYYY-MM-DDTHH:MM:SS`.
fn parse_calendar_date(raw: &str) -> Result<NaiveDate, ApiError> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc).date_naive());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(dt.date());
    }
    Err(ApiError::Validation("Invalid date value".to_string()))
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct NewAttendeeDto {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub event_id: Uuid,
}

impl NewAttendeeDto {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.first_name.trim().is_empty() {
            return Err(ApiError::Validation("First name must not be empty".to_string()));
        }
        if self.last_name.trim().is_empty() {
            return Err(ApiError::Validation("Last name must not be empty".to_string()));
        }
        validate_email(&self.email)
    }

    pub fn into_attendee(self, attendee_id: Uuid) -> Attendee {
        Attendee {
            attendee_id,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email.trim().to_string(),
            phone_number: self.phone_number,
            event_id: self.event_id,
            check_in_status: false,
        }
    }
}

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct UpdateAttendeeDto {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub phone_number: Option<Option<String>>,
    pub check_in_status: Option<bool>,
}

impl UpdateAttendeeDto {
    /// Merges the update into `attendee`, rejecting anything that would
    /// leave it invalid. Check-in can be granted here but never revoked.
    pub fn apply(self, attendee: &mut Attendee) -> Result<(), ApiError> {
        if let Some(v) = self.first_name {
            if v.trim().is_empty() {
                return Err(ApiError::Validation("First name must not be empty".to_string()));
            }
            attendee.first_name = v;
        }
        if let Some(v) = self.last_name {
            if v.trim().is_empty() {
                return Err(ApiError::Validation("Last name must not be empty".to_string()));
            }
            attendee.last_name = v;
        }
        if let Some(v) = self.email {
            validate_email(&v)?;
            attendee.email = v.trim().to_string();
        }
        if let Some(v) = self.phone_number {
            attendee.phone_number = v;
        }
        match self.check_in_status {
            Some(false) if attendee.check_in_status => {
                return Err(ApiError::Validation("Check-in cannot be reverted.".to_string()));
            }
            Some(v) => attendee.check_in_status = v,
            None => {}
        }
        Ok(())
    }
}

fn validate_email(email: &str) -> Result<(), ApiError> {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(ApiError::Validation(format!("Invalid email address '{}'", email))),
    }
}

#[derive(Debug, Default, Deserialize, Clone)]
pub struct AttendeeFilter {
    pub event_id: Option<Uuid>,
    pub check_in_status: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckInResponse {
    pub message: String,
    pub attendee_id: Uuid,
    pub check_in_status: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BulkCheckInResponse {
    pub message: String,
    pub checked_in: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_event() -> Event {
        let start = Utc::now() + Duration::days(1);
        Event {
            event_id: Uuid::new_v4(),
            name: "Conference".to_string(),
            description: Some("Annual".to_string()),
            start_time: start,
            end_time: start + Duration::hours(8),
            location: "Hall A".to_string(),
            max_attendees: 100,
            status: EventStatus::Scheduled,
        }
    }

    fn sample_attendee(checked_in: bool) -> Attendee {
        Attendee {
            attendee_id: Uuid::new_v4(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            phone_number: None,
            event_id: Uuid::new_v4(),
            check_in_status: checked_in,
        }
    }

    #[test]
    fn new_event_defaults_to_scheduled() {
        let start = Utc::now();
        let dto = NewEventDto {
            name: "Launch".to_string(),
            description: None,
            start_time: start,
            end_time: start + Duration::hours(1),
            location: "Online".to_string(),
            max_attendees: 3,
            status: None,
        };
        let event = dto.into_event(Uuid::new_v4());
        assert_eq!(event.status, EventStatus::Scheduled);
        assert!(event.validate().is_ok());
    }

    #[test]
    fn partial_update_leaves_unspecified_fields() {
        let mut event = sample_event();
        let before = event.clone();
        UpdateEventDto {
            location: Some("Hall B".to_string()),
            status: Some(EventStatus::Canceled),
            ..Default::default()
        }
        .apply(&mut event);
        assert_eq!(event.location, "Hall B");
        assert_eq!(event.status, EventStatus::Canceled);
        assert_eq!(event.name, before.name);
        assert_eq!(event.start_time, before.start_time);
        assert_eq!(event.max_attendees, before.max_attendees);
    }

    #[test]
    fn merged_update_can_break_time_window() {
        let mut event = sample_event();
        UpdateEventDto {
            end_time: Some(event.start_time),
            ..Default::default()
        }
        .apply(&mut event);
        assert!(event.validate().is_err());
    }

    #[test]
    fn event_query_parses_filters() {
        let filter = EventQuery {
            status: Some("completed".to_string()),
            location: Some("  berlin ".to_string()),
            date: Some("2024-05-01".to_string()),
        }
        .into_filter()
        .unwrap();
        assert_eq!(filter.status, Some(EventStatus::Completed));
        assert_eq!(filter.location.as_deref(), Some("berlin"));
        assert_eq!(filter.date, NaiveDate::from_ymd_opt(2024, 5, 1));
    }

    #[test]
    fn event_query_accepts_timestamps_for_date() {
        let filter = EventQuery {
            date: Some("2024-05-01T23:30:00Z".to_string()),
            ..Default::default()
        }
        .into_filter()
        .unwrap();
        assert_eq!(filter.date, NaiveDate::from_ymd_opt(2024, 5, 1));

        let filter = EventQuery {
            date: Some("2024-05-02T08:00:00".to_string()),
            ..Default::default()
        }
        .into_filter()
        .unwrap();
        assert_eq!(filter.date, NaiveDate::from_ymd_opt(2024, 5, 2));
    }

    #[test]
    fn event_query_rejects_unknown_status_and_bad_date() {
        let err = EventQuery {
            status: Some("postponed".to_string()),
            ..Default::default()
        }
        .into_filter()
        .unwrap_err();
        assert_eq!(err, ApiError::Validation("Invalid status value".to_string()));

        let err = EventQuery {
            date: Some("yesterday".to_string()),
            ..Default::default()
        }
        .into_filter()
        .unwrap_err();
        assert_eq!(err, ApiError::Validation("Invalid date value".to_string()));
    }

    #[test]
    fn day_bounds_cover_one_utc_day() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 28).unwrap();
        let (from, to) = EventFilter::day_bounds(date).unwrap();
        assert_eq!(from.to_rfc3339(), "2024-02-28T00:00:00+00:00");
        assert_eq!(to - from, Duration::days(1));
    }

    #[test]
    fn timestamps_are_cut_to_microseconds() {
        let start: DateTime<Utc> = "2030-01-01T10:00:00.123456789Z".parse().unwrap();
        let dto = NewEventDto {
            name: "Precise".to_string(),
            description: None,
            start_time: start,
            end_time: start + Duration::hours(1),
            location: "Lab".to_string(),
            max_attendees: 1,
            status: None,
        };
        let event = dto.into_event(Uuid::new_v4());
        assert_eq!(event.start_time.to_rfc3339(), "2030-01-01T10:00:00.123456+00:00");
    }

    #[test]
    fn sub_microsecond_window_is_rejected_before_write() {
        let start: DateTime<Utc> = "2030-01-01T10:00:00.123456700Z".parse().unwrap();
        let dto = NewEventDto {
            name: "Blink".to_string(),
            description: None,
            start_time: start,
            end_time: start + Duration::nanoseconds(100),
            location: "Lab".to_string(),
            max_attendees: 1,
            status: None,
        };
        assert_eq!(
            dto.into_event(Uuid::new_v4()).validate(),
            Err(ApiError::Validation("Start time must be before end time".to_string()))
        );

        let mut event = sample_event();
        UpdateEventDto {
            start_time: Some(start),
            end_time: Some(start + Duration::nanoseconds(200)),
            ..Default::default()
        }
        .apply(&mut event);
        assert_eq!(event.start_time, event.end_time);
        assert!(event.validate().is_err());
    }

    #[test]
    fn null_clears_description_but_absence_keeps_it() {
        let mut event = sample_event();
        let keep: UpdateEventDto = serde_json::from_str(r#"{"name": "Renamed"}"#).unwrap();
        keep.apply(&mut event);
        assert_eq!(event.description.as_deref(), Some("Annual"));

        let clear: UpdateEventDto = serde_json::from_str(r#"{"description": null}"#).unwrap();
        clear.apply(&mut event);
        assert_eq!(event.description, None);
        assert_eq!(event.name, "Renamed");
    }

    #[test]
    fn null_clears_phone_number() {
        let mut attendee = sample_attendee(false);
        attendee.phone_number = Some("+1 555 0100".to_string());
        let update: UpdateAttendeeDto = serde_json::from_str(r#"{"phone_number": null}"#).unwrap();
        update.apply(&mut attendee).unwrap();
        assert_eq!(attendee.phone_number, None);
    }

    #[test]
    fn new_attendee_is_not_checked_in() {
        let dto = NewAttendeeDto {
            first_name: "Grace".to_string(),
            last_name: "Hopper".to_string(),
            email: " grace@example.com ".to_string(),
            phone_number: Some("+1 555 0100".to_string()),
            event_id: Uuid::new_v4(),
        };
        assert!(dto.validate().is_ok());
        let attendee = dto.into_attendee(Uuid::new_v4());
        assert!(!attendee.check_in_status);
        assert_eq!(attendee.email, "grace@example.com");
    }

    #[test]
    fn new_attendee_requires_an_email_address() {
        let dto = NewAttendeeDto {
            first_name: "Grace".to_string(),
            last_name: "Hopper".to_string(),
            email: "not-an-email".to_string(),
            phone_number: None,
            event_id: Uuid::new_v4(),
        };
        assert!(matches!(dto.validate(), Err(ApiError::Validation(_))));
    }

    #[test]
    fn attendee_update_cannot_revert_check_in() {
        let mut attendee = sample_attendee(true);
        let err = UpdateAttendeeDto {
            check_in_status: Some(false),
            ..Default::default()
        }
        .apply(&mut attendee)
        .unwrap_err();
        assert_eq!(err, ApiError::Validation("Check-in cannot be reverted.".to_string()));
        assert!(attendee.check_in_status);
    }

    #[test]
    fn attendee_update_merges_fields() {
        let mut attendee = sample_attendee(false);
        UpdateAttendeeDto {
            last_name: Some("Byron".to_string()),
            check_in_status: Some(true),
            ..Default::default()
        }
        .apply(&mut attendee)
        .unwrap();
        assert_eq!(attendee.first_name, "Ada");
        assert_eq!(attendee.last_name, "Byron");
        assert!(attendee.check_in_status);
    }
}
