// src/routes/admin_routes.rs

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::ApiError,
    middleware::auth_context::AuthContext,
    models::{
        AdminTenureRow, ApiOk, AppState, AppointmentRow, DoctorRow, NewsRow, ServiceRow,
        TreatedPatientRow,
    },
    routes::{
        appointment_routes::fetch_center_appointments, history_routes::fetch_history,
        team_routes::fetch_team,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdminTab {
    News,
    Doctors,
    Services,
    Appointments,
    History,
    Team,
}

#[derive(Debug, Serialize)]
#[serde(tag = "tab", content = "content", rename_all = "lowercase")]
pub enum AdminPanel {
    News(Vec<NewsRow>),
    Doctors(Vec<DoctorRow>),
    Services(Vec<ServiceRow>),
    Appointments {
        appointments: Vec<AppointmentRow>,
        history: Vec<TreatedPatientRow>,
    },
    History {
        appointments: Vec<AppointmentRow>,
        history: Vec<TreatedPatientRow>,
    },
    Team(Vec<AdminTenureRow>),
}

pub fn router() -> Router<AppState> {
    Router::new().route("/centers/{center_id}/admin/{tab}", get(admin_tab))
}

pub async fn admin_tab(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((center_id, tab)): Path<(String, AdminTab)>,
) -> Result<Json<ApiOk<AdminPanel>>, ApiError> {
    auth.ensure_center_admin(&center_id)?;

    let panel = match tab {
        AdminTab::News => AdminPanel::News(
            sqlx::query_as::<_, NewsRow>(
                r#"
                SELECT id, center_id, title, content, media_url, media_type, created_at, expires_at
                FROM news
                WHERE center_id = $1
                ORDER BY created_at DESC
                "#,
            )
            .bind(&center_id)
            .fetch_all(&state.db)
            .await
            .map_err(ApiError::db)?,
        ),
        AdminTab::Doctors => AdminPanel::Doctors(
            sqlx::query_as::<_, DoctorRow>(
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
            .map_err(ApiError::db)?,
        ),
        AdminTab::Services => AdminPanel::Services(
            sqlx::query_as::<_, ServiceRow>(
                r#"
                SELECT id, center_id, name, allowed_days, daily_capacity, is_paused,
                       start_time, interval_minutes
                FROM services
                WHERE center_id = $1
                ORDER BY name ASC
                "#,
            )
            .bind(&center_id)
            .fetch_all(&state.db)
            .await
            .map_err(ApiError::db)?,
        ),
        AdminTab::Appointments | AdminTab::History => {
            let (appointments, history) = tokio::try_join!(
                fetch_center_appointments(&state, &center_id),
                fetch_history(&state, &center_id),
            )
            .map_err(ApiError::db)?;

            if tab == AdminTab::Appointments {
                AdminPanel::Appointments {
                    appointments,
                    history,
                }
            } else {
                AdminPanel::History {
                    appointments,
                    history,
                }
            }
        }
        AdminTab::Team => AdminPanel::Team(
            fetch_team(&state, &center_id)
                .await
                .map_err(ApiError::db)?,
        ),
    };

    Ok(Json(ApiOk { data: panel }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tabs_parse_from_path_segments() {
        let tab: AdminTab = serde_json::from_str("\"history\"").unwrap();
        assert_eq!(tab, AdminTab::History);
        assert!(serde_json::from_str::<AdminTab>("\"settings\"").is_err());
    }

    #[test]
    fn panel_is_tagged_by_tab() {
        let v = serde_json::to_value(AdminPanel::Team(vec![])).unwrap();
        assert_eq!(v["tab"], "team");
        assert!(v["content"].as_array().unwrap().is_empty());
    }
}
