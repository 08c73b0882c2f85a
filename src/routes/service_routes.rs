// src/routes/service_routes.rs

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, patch},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    booking::{self, SlotQuote},
    error::ApiError,
    middleware::auth_context::{AuthContext, Owned},
    models::{ApiOk, AppState, ServiceRow},
    routes::{center_routes::load_snapshot, parse_date, required},
    scheduling::{ClockTime, DEFAULT_INTERVAL_MINUTES, DEFAULT_START_TIME},
    snapshot::{CenterEvent, CenterUpdate},
    store::PgStore,
};

const DEFAULT_ALLOWED_DAYS: [i16; 5] = [1, 2, 3, 4, 5];

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/centers/{center_id}/services", get(list_services).post(create_service))
        .route(
            "/services/{service_id}",
            patch(update_service).delete(delete_service),
        )
        .route("/services/{service_id}/availability", get(availability))
}

#[derive(Debug, Deserialize)]
pub struct ListServicesQuery {
    pub include_paused: Option<bool>,
}

pub async fn list_services(
    State(state): State<AppState>,
    Path(center_id): Path<String>,
    Query(q): Query<ListServicesQuery>,
) -> Result<Json<ApiOk<Vec<ServiceRow>>>, ApiError> {
    let rows: Vec<ServiceRow> = sqlx::query_as::<_, ServiceRow>(
        r#"
        SELECT id, center_id, name, allowed_days, daily_capacity, is_paused,
               start_time, interval_minutes
        FROM services
        WHERE center_id = $1
          AND ($2 OR is_paused = false)
        ORDER BY name ASC
        "#,
    )
    .bind(&center_id)
    .bind(q.include_paused.unwrap_or(false))
    .fetch_all(&state.db)
    .await
    .map_err(ApiError::db)?;

    Ok(Json(ApiOk { data: rows }))
}

#[derive(Debug, Deserialize)]
pub struct CreateServiceRequest {
    pub name: String,
    pub daily_capacity: i32,
    pub allowed_days: Option<Vec<i16>>,
    pub start_time: Option<String>,
    pub interval_minutes: Option<i32>,
}

/// Validated service settings ready to insert.
#[derive(Debug, PartialEq)]
struct ServiceSettings {
    name: String,
    daily_capacity: i32,
    allowed_days: Vec<i16>,
    start_time: String,
    interval_minutes: i32,
}

fn validate_service(req: CreateServiceRequest) -> Result<ServiceSettings, ApiError> {
    let name = required("name", &req.name)?;
    if req.daily_capacity <= 0 {
        return Err(ApiError::validation("daily_capacity must be > 0"));
    }

    let interval_minutes = req
        .interval_minutes
        .unwrap_or(DEFAULT_INTERVAL_MINUTES as i32);
    if interval_minutes <= 0 {
        return Err(ApiError::validation("interval_minutes must be > 0"));
    }

    // Reject malformed times here so booking never sees them.
    let start_time = match req.start_time.as_deref().map(str::trim) {
        None | Some("") => DEFAULT_START_TIME.to_string(),
        Some(raw) => raw.parse::<ClockTime>()?.to_string(),
    };

    let mut allowed_days = req
        .allowed_days
        .unwrap_or_else(|| DEFAULT_ALLOWED_DAYS.to_vec());
    if allowed_days.iter().any(|d| !(0..=6).contains(d)) {
        return Err(ApiError::validation("allowed_days must be weekday numbers 0-6"));
    }
    allowed_days.sort_unstable();
    allowed_days.dedup();
    if allowed_days.is_empty() {
        return Err(ApiError::validation("allowed_days must not be empty"));
    }

    Ok(ServiceSettings {
        name,
        daily_capacity: req.daily_capacity,
        allowed_days,
        start_time,
        interval_minutes,
    })
}

pub async fn create_service(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(center_id): Path<String>,
    Json(req): Json<CreateServiceRequest>,
) -> Result<Json<ApiOk<CenterUpdate<ServiceRow>>>, ApiError> {
    auth.ensure_center_admin(&center_id)?;
    let s = validate_service(req)?;
    let before = load_snapshot(&state, &center_id).await?;

    let row = sqlx::query_as::<_, ServiceRow>(
        r#"
        INSERT INTO services
            (id, center_id, name, allowed_days, daily_capacity, is_paused, start_time, interval_minutes)
        VALUES ($1, $2, $3, $4, $5, false, $6, $7)
        RETURNING id, center_id, name, allowed_days, daily_capacity, is_paused,
                  start_time, interval_minutes
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&center_id)
    .bind(s.name)
    .bind(s.allowed_days)
    .bind(s.daily_capacity)
    .bind(s.start_time)
    .bind(s.interval_minutes)
    .fetch_one(&state.db)
    .await
    .map_err(ApiError::db)?;

    tracing::info!(service_id = %row.id, %center_id, "service created");
    let event = CenterEvent::ServiceAdded(row.clone());
    Ok(Json(ApiOk {
        data: before.after(row, [event]),
    }))
}

#[derive(Debug, Deserialize)]
pub struct UpdateServiceRequest {
    pub is_paused: bool,
}

/// Only pausing/resuming is editable; other settings are fixed once created.
pub async fn update_service(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(service_id): Path<Uuid>,
    Json(req): Json<UpdateServiceRequest>,
) -> Result<Json<ApiOk<CenterUpdate<ServiceRow>>>, ApiError> {
    let center_id = auth.ensure_owns(&state, Owned::Service, service_id).await?;
    let before = load_snapshot(&state, &center_id).await?;

    let row = sqlx::query_as::<_, ServiceRow>(
        r#"
        UPDATE services
        SET is_paused = $2
        WHERE id = $1
        RETURNING id, center_id, name, allowed_days, daily_capacity, is_paused,
                  start_time, interval_minutes
        "#,
    )
    .bind(service_id)
    .bind(req.is_paused)
    .fetch_one(&state.db)
    .await
    .map_err(ApiError::db)?;

    tracing::info!(%service_id, is_paused = row.is_paused, "service pause changed");
    let toggle = before.pause_change(service_id, row.is_paused);
    Ok(Json(ApiOk {
        data: before.after(row, toggle),
    }))
}

pub async fn delete_service(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(service_id): Path<Uuid>,
) -> Result<Json<ApiOk<CenterUpdate<Uuid>>>, ApiError> {
    let center_id = auth.ensure_owns(&state, Owned::Service, service_id).await?;
    let before = load_snapshot(&state, &center_id).await?;

    sqlx::query("DELETE FROM services WHERE id = $1")
        .bind(service_id)
        .execute(&state.db)
        .await
        .map_err(ApiError::db)?;

    Ok(Json(ApiOk {
        data: before.after(service_id, [CenterEvent::ServiceRemoved(service_id)]),
    }))
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub date: String,
}

/// Public preview: remaining slots and the time the next booking would get.
pub async fn availability(
    State(state): State<AppState>,
    Path(service_id): Path<Uuid>,
    Query(q): Query<AvailabilityQuery>,
) -> Result<Json<ApiOk<SlotQuote>>, ApiError> {
    let date = parse_date("date", &q.date)?;
    let store = PgStore::new(state.db.clone());
    let quote = booking::quote(&store, service_id, date).await?;
    Ok(Json(ApiOk { data: quote }))
}
