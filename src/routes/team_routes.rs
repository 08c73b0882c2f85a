// src/routes/team_routes.rs

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    error::ApiError,
    middleware::auth_context::AuthContext,
    models::{AdminTenureRow, ApiOk, AppState, OkResponse},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/centers/{center_id}/team", get(list_team))
        .route("/centers/{center_id}/team/{user_id}/revoke", post(revoke_admin))
}

pub(crate) async fn fetch_team(
    state: &AppState,
    center_id: &str,
) -> Result<Vec<AdminTenureRow>, sqlx::Error> {
    sqlx::query_as::<_, AdminTenureRow>(
        r#"
        SELECT
          ca.user_id,
          ca.center_id,
          u.first_name,
          u.last_name,
          u.phone,
          ca.start_date,
          ca.end_date,
          ca.is_active,
          (COALESCE(ca.end_date, CURRENT_DATE) - ca.start_date)::int AS days_in_office
        FROM center_admins ca
        JOIN app_user u ON u.user_id = ca.user_id
        WHERE ca.center_id = $1
        ORDER BY ca.is_active DESC, ca.start_date ASC
        "#,
    )
    .bind(center_id)
    .fetch_all(&state.db)
    .await
}

pub async fn list_team(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(center_id): Path<String>,
) -> Result<Json<ApiOk<Vec<AdminTenureRow>>>, ApiError> {
    auth.ensure_center_admin(&center_id)?;
    let rows = fetch_team(&state, &center_id).await.map_err(ApiError::db)?;
    Ok(Json(ApiOk { data: rows }))
}

/// Ends a tenure. The account stays; it just loses access to this center.
pub async fn revoke_admin(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((center_id, user_id)): Path<(String, Uuid)>,
) -> Result<Json<OkResponse>, ApiError> {
    auth.ensure_center_admin(&center_id)?;

    let res = sqlx::query(
        r#"
        UPDATE center_admins
        SET is_active = false,
            end_date = CURRENT_DATE
        WHERE center_id = $1
          AND user_id = $2
          AND is_active = true
        "#,
    )
    .bind(&center_id)
    .bind(user_id)
    .execute(&state.db)
    .await
    .map_err(ApiError::db)?;

    if res.rows_affected() == 0 {
        return Err(ApiError::not_found("active administrator"));
    }

    // Drop their sessions if they administer nothing else.
    sqlx::query(
        r#"
        UPDATE session_token
        SET revoked_at = now()
        WHERE user_id = $1
          AND revoked_at IS NULL
          AND NOT EXISTS (
              SELECT 1 FROM center_admins
              WHERE user_id = $1 AND is_active = true
          )
          AND NOT EXISTS (
              SELECT 1 FROM app_user
              WHERE user_id = $1 AND role = 1
          )
        "#,
    )
    .bind(user_id)
    .execute(&state.db)
    .await
    .map_err(ApiError::db)?;

    tracing::info!(%center_id, %user_id, revoked_by = %auth.user_id, "admin revoked");
    Ok(Json(OkResponse::ok()))
}
