// src/routes/center_routes.rs

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    booking::{public_slot, upcoming},
    error::ApiError,
    middleware::auth_context::AuthContext,
    models::{
        ApiOk, AppState, AppointmentRow, CenterRow, DoctorRow, NewsRow, OkResponse, PublicSlotRow,
        ServiceRow,
    },
    routes::required,
    snapshot::{CenterEvent, CenterSnapshot},
};

const THEME_PRESETS: [&str; 3] = ["clinical", "vascular", "xray"];

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/centers", get(list_centers).post(create_center))
        .route("/centers/{center_id}", get(get_center).patch(update_center).delete(delete_center))
        .route("/centers/{center_id}/overview", get(center_overview))
}

pub(crate) async fn load_center(state: &AppState, center_id: &str) -> Result<CenterRow, ApiError> {
    sqlx::query_as::<_, CenterRow>(
        r#"
        SELECT id, name, location, city, primary_color, theme_preset
        FROM centers
        WHERE id = $1
        "#,
    )
    .bind(center_id)
    .fetch_optional(&state.db)
    .await
    .map_err(ApiError::db)?
    .ok_or_else(|| ApiError::not_found("center"))
}

fn check_theme(theme: Option<&str>) -> Result<(), ApiError> {
    match theme {
        Some(t) if !THEME_PRESETS.contains(&t) => Err(ApiError::validation(format!(
            "theme_preset must be one of {}",
            THEME_PRESETS.join(", ")
        ))),
        _ => Ok(()),
    }
}

pub async fn list_centers(
    State(state): State<AppState>,
) -> Result<Json<ApiOk<Vec<CenterRow>>>, ApiError> {
    let rows = sqlx::query_as::<_, CenterRow>(
        r#"
        SELECT id, name, location, city, primary_color, theme_preset
        FROM centers
        ORDER BY name ASC
        "#,
    )
    .fetch_all(&state.db)
    .await
    .map_err(ApiError::db)?;

    Ok(Json(ApiOk { data: rows }))
}

pub async fn get_center(
    State(state): State<AppState>,
    Path(center_id): Path<String>,
) -> Result<Json<ApiOk<CenterRow>>, ApiError> {
    Ok(Json(ApiOk {
        data: load_center(&state, &center_id).await?,
    }))
}

#[derive(Debug, Deserialize)]
pub struct CreateCenterRequest {
    pub id: String,
    pub name: String,
    pub location: Option<String>,
    pub city: Option<String>,
    pub primary_color: Option<String>,
    pub theme_preset: Option<String>,
}

/// Returned to the super-admin only; carries the code new admins register with.
#[derive(Debug, Serialize)]
pub struct CreatedCenter {
    #[serde(flatten)]
    pub center: CenterRow,
    pub registration_code: Uuid,
}

pub async fn create_center(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<CreateCenterRequest>,
) -> Result<Json<ApiOk<CreatedCenter>>, ApiError> {
    auth.ensure_super_admin()?;

    let id = required("id", &req.id)?;
    let name = required("name", &req.name)?;
    check_theme(req.theme_preset.as_deref())?;
    let registration_code = Uuid::new_v4();

    let center = sqlx::query_as::<_, CenterRow>(
        r#"
        INSERT INTO centers (id, name, location, city, primary_color, theme_preset, registration_code)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (id) DO NOTHING
        RETURNING id, name, location, city, primary_color, theme_preset
        "#,
    )
    .bind(&id)
    .bind(name)
    .bind(req.location.unwrap_or_default())
    .bind(req.city)
    .bind(req.primary_color)
    .bind(req.theme_preset)
    .bind(registration_code)
    .fetch_optional(&state.db)
    .await
    .map_err(ApiError::db)?
    .ok_or_else(|| ApiError::Conflict("CENTER_EXISTS", format!("center {id} already exists")))?;

    tracing::info!(center_id = %center.id, "center created");
    Ok(Json(ApiOk {
        data: CreatedCenter {
            center,
            registration_code,
        },
    }))
}

#[derive(Debug, Deserialize)]
pub struct UpdateCenterRequest {
    pub name: Option<String>,
    pub location: Option<String>,
    pub city: Option<Option<String>>,
    pub primary_color: Option<Option<String>>,
    pub theme_preset: Option<Option<String>>,
}

pub async fn update_center(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(center_id): Path<String>,
    Json(req): Json<UpdateCenterRequest>,
) -> Result<Json<ApiOk<CenterRow>>, ApiError> {
    auth.ensure_super_admin()?;

    let name = req.name.as_deref().map(|n| required("name", n)).transpose()?;
    if let Some(theme) = &req.theme_preset {
        check_theme(theme.as_deref())?;
    }

    let mut current = load_center(&state, &center_id).await?;
    if let Some(name) = name {
        current.name = name;
    }
    if let Some(location) = req.location {
        current.location = location;
    }
    if let Some(city) = req.city {
        current.city = city;
    }
    if let Some(color) = req.primary_color {
        current.primary_color = color;
    }
    if let Some(theme) = req.theme_preset {
        current.theme_preset = theme;
    }

    let row = sqlx::query_as::<_, CenterRow>(
        r#"
        UPDATE centers
        SET name = $2, location = $3, city = $4, primary_color = $5, theme_preset = $6
        WHERE id = $1
        RETURNING id, name, location, city, primary_color, theme_preset
        "#,
    )
    .bind(&current.id)
    .bind(&current.name)
    .bind(&current.location)
    .bind(&current.city)
    .bind(&current.primary_color)
    .bind(&current.theme_preset)
    .fetch_one(&state.db)
    .await
    .map_err(ApiError::db)?;

    Ok(Json(ApiOk { data: row }))
}

pub async fn delete_center(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(center_id): Path<String>,
) -> Result<Json<OkResponse>, ApiError> {
    auth.ensure_super_admin()?;

    let res = sqlx::query("DELETE FROM centers WHERE id = $1")
        .bind(&center_id)
        .execute(&state.db)
        .await
        .map_err(ApiError::db)?;

    if res.rows_affected() == 0 {
        return Err(ApiError::not_found("center"));
    }
    tracing::warn!(%center_id, "center deleted");
    Ok(Json(OkResponse::ok()))
}

#[derive(Debug, Serialize)]
pub struct CenterOverview {
    pub center: CenterRow,
    pub news: Vec<NewsRow>,
    pub doctors: Vec<DoctorRow>,
    /// Services accepting bookings (not paused).
    pub services: Vec<ServiceRow>,
    pub upcoming: Vec<PublicSlotRow>,
}

/// Current public state of a center, folded from freshly loaded rows.
pub(crate) async fn load_snapshot(
    state: &AppState,
    center_id: &str,
) -> Result<CenterSnapshot, ApiError> {
    let center = load_center(state, center_id).await?;

    let (news, doctors, services, appointments) = tokio::try_join!(
        sqlx::query_as::<_, NewsRow>(
            r#"
            SELECT id, center_id, title, content, media_url, media_type, created_at, expires_at
            FROM news
            WHERE center_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(center_id)
        .fetch_all(&state.db),
        sqlx::query_as::<_, DoctorRow>(
            r#"
            SELECT id, center_id, name, specialty, description, image_url
            FROM doctors
            WHERE center_id = $1
            ORDER BY name ASC
            "#,
        )
        .bind(center_id)
        .fetch_all(&state.db),
        sqlx::query_as::<_, ServiceRow>(
            r#"
            SELECT id, center_id, name, allowed_days, daily_capacity, is_paused,
                   start_time, interval_minutes
            FROM services
            WHERE center_id = $1
            ORDER BY name ASC
            "#,
        )
        .bind(center_id)
        .fetch_all(&state.db),
        sqlx::query_as::<_, AppointmentRow>(
            r#"
            SELECT id, center_id, service_id, patient_name, patient_id, patient_phone,
                   date, time, status, created_at
            FROM appointments
            WHERE center_id = $1
              AND date >= CURRENT_DATE
            "#,
        )
        .bind(center_id)
        .fetch_all(&state.db),
    )
    .map_err(ApiError::db)?;

    let now = Utc::now();
    Ok(CenterSnapshot::new(center).apply_all([
        CenterEvent::NewsLoaded(news),
        CenterEvent::NewsExpired(now),
        CenterEvent::DoctorsLoaded(doctors),
        CenterEvent::ServicesLoaded(services),
        CenterEvent::AppointmentsLoaded(appointments.iter().map(public_slot).collect()),
    ]))
}

/// Everything the public landing page of a center shows.
pub async fn center_overview(
    State(state): State<AppState>,
    Path(center_id): Path<String>,
) -> Result<Json<ApiOk<CenterOverview>>, ApiError> {
    let snap = load_snapshot(&state, &center_id).await?;
    let now = Utc::now();

    let services = snap.active_services().cloned().collect();
    let upcoming = upcoming(&snap.appointments, now.date_naive());

    Ok(Json(ApiOk {
        data: CenterOverview {
            center: snap.center,
            news: snap.news,
            doctors: snap.doctors,
            services,
            upcoming,
        },
    }))
}
