use crate::error::ApiError;
use crate::models::AppState;
use axum::Router;
use chrono::NaiveDate;

pub mod admin_routes;
pub mod appointment_routes;
pub mod auth_routes;
pub mod center_routes;
pub mod doctor_routes;
pub mod health_routes;
pub mod history_routes;
pub mod news_routes;
pub mod service_routes;
pub mod team_routes;

pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1/auth", auth_routes::router())
        .nest("/api/v1", center_routes::router())
        .nest("/api/v1", news_routes::router())
        .nest("/api/v1", doctor_routes::router())
        .nest("/api/v1", service_routes::router())
        .nest("/api/v1", appointment_routes::router())
        .nest("/api/v1", history_routes::router())
        .nest("/api/v1", team_routes::router())
        .nest("/api/v1", admin_routes::router())
        .merge(health_routes::router())
        .with_state(state)
}

/// YYYY-MM-DD
pub(crate) fn parse_date(field: &str, raw: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| ApiError::validation(format!("{field} must be YYYY-MM-DD")))
}

pub(crate) fn required(field: &str, value: &str) -> Result<String, ApiError> {
    let v = value.trim();
    if v.is_empty() {
        Err(ApiError::validation(format!("{field} is required")))
    } else {
        Ok(v.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_date_accepts_iso_days_only() {
        assert_eq!(
            parse_date("date", " 2026-03-02 ").unwrap(),
            NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
        );
        assert!(parse_date("date", "02/03/2026").is_err());
    }

    #[test]
    fn required_trims() {
        assert_eq!(required("name", "  Ana ").unwrap(), "Ana");
        assert_eq!(required("name", "   ").unwrap_err().code(), "VALIDATION_ERROR");
    }
}
