// src/routes/history_routes.rs

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{delete, get},
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    error::ApiError,
    history::{self, HistoryWindow},
    middleware::auth_context::{AuthContext, Owned},
    models::{ApiOk, AppState, OkResponse, TreatedPatientRow},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/centers/{center_id}/history", get(list_history))
        .route("/history/{record_id}", delete(delete_history_record))
}

pub(crate) async fn fetch_history(
    state: &AppState,
    center_id: &str,
) -> Result<Vec<TreatedPatientRow>, sqlx::Error> {
    sqlx::query_as::<_, TreatedPatientRow>(
        r#"
        SELECT id, center_id, patient_name, patient_id, patient_phone, service_name, treated_at, notes
        FROM treated_patients
        WHERE center_id = $1
        ORDER BY treated_at DESC
        "#,
    )
    .bind(center_id)
    .fetch_all(&state.db)
    .await
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub window: HistoryWindow,
}

pub async fn list_history(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(center_id): Path<String>,
    Query(q): Query<HistoryQuery>,
) -> Result<Json<ApiOk<Vec<TreatedPatientRow>>>, ApiError> {
    auth.ensure_center_admin(&center_id)?;
    let rows = fetch_history(&state, &center_id)
        .await
        .map_err(ApiError::db)?;
    Ok(Json(ApiOk {
        data: history::filter(rows, q.window, Utc::now()),
    }))
}

pub async fn delete_history_record(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(record_id): Path<Uuid>,
) -> Result<Json<OkResponse>, ApiError> {
    auth.ensure_owns(&state, Owned::TreatedPatient, record_id).await?;

    sqlx::query("DELETE FROM treated_patients WHERE id = $1")
        .bind(record_id)
        .execute(&state.db)
        .await
        .map_err(ApiError::db)?;

    Ok(Json(OkResponse::ok()))
}
