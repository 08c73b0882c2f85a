// src/routes/doctor_routes.rs

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{delete, get},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    error::ApiError,
    middleware::auth_context::{AuthContext, Owned},
    models::{ApiOk, AppState, DoctorRow},
    routes::{center_routes::load_snapshot, required},
    snapshot::{CenterEvent, CenterUpdate},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/centers/{center_id}/doctors", get(list_doctors).post(create_doctor))
        .route("/doctors/{doctor_id}", delete(delete_doctor))
}

pub async fn list_doctors(
    State(state): State<AppState>,
    Path(center_id): Path<String>,
) -> Result<Json<ApiOk<Vec<DoctorRow>>>, ApiError> {
    let rows = sqlx::query_as::<_, DoctorRow>(
        r#"
        SELECT id, center_id, name, specialty, description, image_url
        FROM doctors
        WHERE center_id = $1
        ORDER BY name ASC
        "#,
    )
    .bind(&center_id)
    .fetch_all(&state.db)
    .await
    .map_err(ApiError::db)?;

    Ok(Json(ApiOk { data: rows }))
}

#[derive(Debug, Deserialize)]
pub struct CreateDoctorRequest {
    pub name: String,
    pub specialty: String,
    pub description: Option<String>,
    /// URL or data URL of the portrait.
    pub image_url: Option<String>,
}

pub async fn create_doctor(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(center_id): Path<String>,
    Json(req): Json<CreateDoctorRequest>,
) -> Result<Json<ApiOk<CenterUpdate<DoctorRow>>>, ApiError> {
    auth.ensure_center_admin(&center_id)?;

    let name = required("name", &req.name)?;
    let specialty = required("specialty", &req.specialty)?;
    let description = req.description.unwrap_or_default().trim().to_string();
    let image_url = req.image_url.unwrap_or_default().trim().to_string();
    let before = load_snapshot(&state, &center_id).await?;

    let row = sqlx::query_as::<_, DoctorRow>(
        r#"
        INSERT INTO doctors (id, center_id, name, specialty, description, image_url)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, center_id, name, specialty, description, image_url
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&center_id)
    .bind(name)
    .bind(specialty)
    .bind(description)
    .bind(image_url)
    .fetch_one(&state.db)
    .await
    .map_err(ApiError::db)?;

    let event = CenterEvent::DoctorAdded(row.clone());
    Ok(Json(ApiOk {
        data: before.after(row, [event]),
    }))
}

pub async fn delete_doctor(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<ApiOk<CenterUpdate<Uuid>>>, ApiError> {
    let center_id = auth.ensure_owns(&state, Owned::Doctor, doctor_id).await?;
    let before = load_snapshot(&state, &center_id).await?;

    sqlx::query("DELETE FROM doctors WHERE id = $1")
        .bind(doctor_id)
        .execute(&state.db)
        .await
        .map_err(ApiError::db)?;

    Ok(Json(ApiOk {
        data: before.after(doctor_id, [CenterEvent::DoctorRemoved(doctor_id)]),
    }))
}
