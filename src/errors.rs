use actix_web::{
    error,
    http::StatusCode,
    HttpResponse,
};
use derive_more::Display;
use log::error;
use serde::{Deserialize, Serialize};

pub const EVENT_NOT_FOUND: &str = "Event not found.";
pub const ATTENDEE_NOT_FOUND: &str = "Attendee not found.";

#[derive(Debug, Display, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[display(fmt = "{}", _0)]
    Validation(String),

    #[display(fmt = "{}", _0)]
    NotFound(String),

    #[display(fmt = "{}", _0)]
    Duplicate(String),

    #[display(fmt = "internal error")]
    Internal,
}

impl std::error::Error for ApiError {}

/// Wire shape of every error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

impl ApiError {
    pub fn category(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Duplicate(_) => "DUPLICATE",
            ApiError::Internal => "INTERNAL",
        }
    }
}

impl error::ResponseError for ApiError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.category().to_string(),
            message: self.to_string(),
        })
    }

    fn status_code(&self) -> StatusCode {
        match *self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Duplicate(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Record not found.".to_string()),
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                match db_err.constraint() {
                    Some("attendees_email_key") => ApiError::Duplicate(
                        "An attendee with this email already exists.".to_string(),
                    ),
                    _ => ApiError::Duplicate("Duplicate entry.".to_string()),
                }
            }
            sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                ApiError::NotFound(EVENT_NOT_FOUND.to_string())
            }
            sqlx::Error::Database(db_err) if db_err.is_check_violation() => {
                match db_err.constraint() {
                    Some("events_time_window") => ApiError::Validation(
                        "Start time must be before end time".to_string(),
                    ),
                    _ => ApiError::Validation("Invalid field value.".to_string()),
                }
            }
            _ => {
                error!("database error: {}", err);
                ApiError::Internal
            }
        }
    }
}
