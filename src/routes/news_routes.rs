// src/routes/news_routes.rs

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{delete, get},
};
use chrono::{Duration, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    error::ApiError,
    middleware::auth_context::{AuthContext, Owned},
    models::{ApiOk, AppState, NewsRow},
    routes::{center_routes::load_snapshot, required},
    snapshot::{CenterEvent, CenterUpdate},
};

const DEFAULT_DURATION_HOURS: f64 = 24.0;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/centers/{center_id}/news", get(list_active_news).post(create_news))
        .route("/news/{news_id}", delete(delete_news))
}

/// Public: only items that have not expired yet, newest first.
pub async fn list_active_news(
    State(state): State<AppState>,
    Path(center_id): Path<String>,
) -> Result<Json<ApiOk<Vec<NewsRow>>>, ApiError> {
    let rows = sqlx::query_as::<_, NewsRow>(
        r#"
        SELECT id, center_id, title, content, media_url, media_type, created_at, expires_at
        FROM news
        WHERE center_id = $1
          AND expires_at > now()
        ORDER BY created_at DESC
        "#,
    )
    .bind(&center_id)
    .fetch_all(&state.db)
    .await
    .map_err(ApiError::db)?;

    Ok(Json(ApiOk { data: rows }))
}

#[derive(Debug, Deserialize)]
pub struct CreateNewsRequest {
    pub title: String,
    pub content: String,
    /// How long the item stays public; fractional hours allowed.
    pub duration_hours: Option<f64>,
    pub media_url: Option<String>,
    pub media_type: Option<String>,
}

fn media_of(req: &CreateNewsRequest) -> Result<(Option<String>, Option<String>), ApiError> {
    match (req.media_type.as_deref(), req.media_url.as_deref().map(str::trim)) {
        (None | Some("none"), _) => Ok((None, None)),
        (Some(kind @ ("image" | "video")), Some(url)) if !url.is_empty() => {
            Ok((Some(url.to_string()), Some(kind.to_string())))
        }
        (Some("image" | "video"), _) => {
            Err(ApiError::validation("media_url is required for media"))
        }
        (Some(_), _) => Err(ApiError::validation("media_type must be image, video or none")),
    }
}

pub async fn create_news(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(center_id): Path<String>,
    Json(req): Json<CreateNewsRequest>,
) -> Result<Json<ApiOk<CenterUpdate<NewsRow>>>, ApiError> {
    auth.ensure_center_admin(&center_id)?;

    let title = required("title", &req.title)?;
    let content = required("content", &req.content)?;
    let hours = req.duration_hours.unwrap_or(DEFAULT_DURATION_HOURS);
    if !hours.is_finite() || hours <= 0.0 {
        return Err(ApiError::validation("duration_hours must be > 0"));
    }
    let (media_url, media_type) = media_of(&req)?;

    let before = load_snapshot(&state, &center_id).await?;
    let created_at = Utc::now();
    let expires_at = created_at + Duration::seconds((hours * 3600.0).round() as i64);

    let row = sqlx::query_as::<_, NewsRow>(
        r#"
        INSERT INTO news (id, center_id, title, content, media_url, media_type, created_at, expires_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id, center_id, title, content, media_url, media_type, created_at, expires_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&center_id)
    .bind(title)
    .bind(content)
    .bind(media_url)
    .bind(media_type)
    .bind(created_at)
    .bind(expires_at)
    .fetch_one(&state.db)
    .await
    .map_err(ApiError::db)?;

    let event = CenterEvent::NewsAdded(row.clone());
    Ok(Json(ApiOk {
        data: before.after(row, [event]),
    }))
}

pub async fn delete_news(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(news_id): Path<Uuid>,
) -> Result<Json<ApiOk<CenterUpdate<Uuid>>>, ApiError> {
    let center_id = auth.ensure_owns(&state, Owned::News, news_id).await?;
    let before = load_snapshot(&state, &center_id).await?;

    sqlx::query("DELETE FROM news WHERE id = $1")
        .bind(news_id)
        .execute(&state.db)
        .await
        .map_err(ApiError::db)?;

    Ok(Json(ApiOk {
        data: before.after(news_id, [CenterEvent::NewsRemoved(news_id)]),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(kind: Option<&str>, url: Option<&str>) -> CreateNewsRequest {
        CreateNewsRequest {
            title: "t".into(),
            content: "c".into(),
            duration_hours: None,
            media_url: url.map(str::to_string),
            media_type: kind.map(str::to_string),
        }
    }

    #[test]
    fn media_is_dropped_when_none() {
        assert_eq!(media_of(&req(Some("none"), Some("http://x"))).unwrap(), (None, None));
        assert_eq!(media_of(&req(None, None)).unwrap(), (None, None));
    }

    #[test]
    fn media_needs_a_url_and_known_kind() {
        assert_eq!(
            media_of(&req(Some("video"), Some(" http://v "))).unwrap(),
            (Some("http://v".to_string()), Some("video".to_string()))
        );
        assert!(media_of(&req(Some("image"), Some(""))).is_err());
        assert!(media_of(&req(Some("audio"), Some("http://a"))).is_err());
    }
}
