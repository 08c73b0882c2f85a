use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::booking::BookingError;
use crate::lifecycle::TransitionError;
use crate::scheduling::ClockParseError;
use crate::store::StoreError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorObject,
}

#[derive(Debug, Serialize)]
pub struct ErrorObject {
    pub code: String,
    pub message: String,
}

#[derive(Debug)]
pub enum ApiError {
    Unauthorized(&'static str, String),
    Forbidden(&'static str, String),
    BadRequest(&'static str, String),
    NotFound(&'static str, String),
    Conflict(&'static str, String),
    TooManyRequests(&'static str, String),
    Internal(String),
}

impl ApiError {
    pub fn invalid_credentials() -> Self {
        ApiError::Unauthorized("INVALID_CREDENTIALS", "Email or password is incorrect".into())
    }

    pub fn session_expired() -> Self {
        ApiError::Unauthorized("SESSION_EXPIRED", "Session expired".into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::BadRequest("VALIDATION_ERROR", message.into())
    }

    pub fn not_found(what: &str) -> Self {
        ApiError::NotFound("NOT_FOUND", format!("{what} not found"))
    }

    pub fn db(e: sqlx::Error) -> Self {
        ApiError::Internal(format!("db error: {e}"))
    }

    pub fn code(&self) -> &str {
        match self {
            ApiError::Unauthorized(code, _)
            | ApiError::Forbidden(code, _)
            | ApiError::BadRequest(code, _)
            | ApiError::NotFound(code, _)
            | ApiError::Conflict(code, _)
            | ApiError::TooManyRequests(code, _) => *code,
            ApiError::Internal(_) => "INTERNAL",
        }
    }

    fn to_error_response(code: &str, message: &str) -> Json<ErrorResponse> {
        Json(ErrorResponse {
            error: ErrorObject {
                code: code.to_string(),
                message: message.to_string(),
            },
        })
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, msg) = match self {
            ApiError::Unauthorized(code, msg) => (StatusCode::UNAUTHORIZED, code, msg),
            ApiError::Forbidden(code, msg) => (StatusCode::FORBIDDEN, code, msg),
            ApiError::BadRequest(code, msg) => (StatusCode::BAD_REQUEST, code, msg),
            ApiError::NotFound(code, msg) => (StatusCode::NOT_FOUND, code, msg),
            ApiError::Conflict(code, msg) => (StatusCode::CONFLICT, code, msg),
            ApiError::TooManyRequests(code, msg) => (StatusCode::TOO_MANY_REQUESTS, code, msg),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL", msg)
            }
        };
        (status, ApiError::to_error_response(code, &msg)).into_response()
    }
}

impl From<ClockParseError> for ApiError {
    fn from(e: ClockParseError) -> Self {
        ApiError::validation(e.to_string())
    }
}

impl From<TransitionError> for ApiError {
    fn from(e: TransitionError) -> Self {
        ApiError::Conflict("INVALID_TRANSITION", e.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::CapacityExceeded(_) => ApiError::Conflict("FULLY_BOOKED", e.to_string()),
            StoreError::PastMidnight(_) => ApiError::Conflict("SLOT_PAST_MIDNIGHT", e.to_string()),
            StoreError::DailyLimitExceeded { .. } => {
                ApiError::TooManyRequests("DAILY_LIMIT_EXCEEDED", e.to_string())
            }
            StoreError::Db(e) => ApiError::db(e),
        }
    }
}

impl From<BookingError> for ApiError {
    fn from(e: BookingError) -> Self {
        let msg = e.to_string();
        match e {
            BookingError::Validation(_) => ApiError::validation(msg),
            BookingError::ServiceNotFound(_) => ApiError::NotFound("SERVICE_NOT_FOUND", msg),
            BookingError::WrongCenter => ApiError::BadRequest("SERVICE_NOT_IN_CENTER", msg),
            BookingError::Paused => ApiError::Conflict("SERVICE_PAUSED", msg),
            BookingError::DayNotAllowed { .. } => ApiError::BadRequest("DAY_NOT_ALLOWED", msg),
            BookingError::DateInPast => ApiError::BadRequest("DATE_IN_PAST", msg),
            BookingError::FullyBooked => ApiError::Conflict("FULLY_BOOKED", msg),
            BookingError::PastMidnight => ApiError::Conflict("SLOT_PAST_MIDNIGHT", msg),
            BookingError::Config(_) => ApiError::Conflict("INVALID_SERVICE_CONFIG", msg),
            BookingError::Store(e) => e.into(),
        }
    }
}
