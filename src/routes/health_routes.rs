use axum::{Json, Router, extract::State, routing::get};

use crate::db::{SystemStatus, system_status};
use crate::models::AppState;

#[derive(serde::Serialize)]
pub struct HealthResponse {
    pub data: HealthData,
}

#[derive(serde::Serialize)]
pub struct HealthData {
    pub status: SystemStatus,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

/// Setup check for the front-end: is the database reachable and seeded?
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        data: HealthData {
            status: system_status(&state.db).await,
        },
    })
}
