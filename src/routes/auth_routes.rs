use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::{
    auth::{MIN_PASSWORD_LEN, hash_password, issue_access_token, verify_password},
    error::ApiError,
    middleware::auth_context::AuthContext,
    models::*,
    routes::required,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/register", post(register))
        .route("/me", get(me))
        .route("/logout", post(logout))
}

async fn load_user_by_email(state: &AppState, email: &str) -> Result<Option<UserRow>, ApiError> {
    sqlx::query_as::<_, UserRow>(
        r#"
        SELECT user_id, email, first_name, last_name, password_hash, role, is_active
        FROM app_user
        WHERE email = $1
        "#,
    )
    .bind(email)
    .fetch_optional(&state.db)
    .await
    .map_err(ApiError::db)
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let email = req.email.trim().to_lowercase();
    if email.is_empty() || req.password.is_empty() {
        return Err(ApiError::validation("email and password are required"));
    }

    let user = load_user_by_email(&state, &email)
        .await?
        .ok_or_else(ApiError::invalid_credentials)?;

    if !user.is_active {
        return Err(ApiError::Forbidden("FORBIDDEN", "Account is disabled".into()));
    }
    if !verify_password(&req.password, &user.password_hash) {
        tracing::info!(%email, "failed login");
        return Err(ApiError::invalid_credentials());
    }

    let issued = issue_access_token();
    let expires_at = Utc::now() + Duration::hours(state.session_ttl_hours);

    let session: SessionTokenRow = sqlx::query_as::<_, SessionTokenRow>(
        r#"
        INSERT INTO session_token
            (user_id, session_token_hash, device_name, expires_at)
        VALUES
            ($1, $2, $3, $4)
        RETURNING session_token_id, expires_at
        "#,
    )
    .bind(user.user_id)
    .bind(&issued.hash)
    .bind(req.device_name.as_deref())
    .bind(expires_at)
    .fetch_one(&state.db)
    .await
    .map_err(ApiError::db)?;

    tracing::info!(user_id = %user.user_id, "login");

    Ok(Json(LoginResponse {
        data: LoginResponseData {
            access_token: issued.token,
            expires_at: session.expires_at,
            user: user.profile(),
        },
    }))
}

/// Sign up as administrator of a center. The caller proves they may do so
/// with the center's registration code.
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterAdminRequest>,
) -> Result<Json<ApiOk<UserProfile>>, ApiError> {
    let email = required("email", &req.email)?.to_lowercase();
    if !email.contains('@') {
        return Err(ApiError::validation("email is not valid"));
    }
    if req.password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    let first_name = required("first_name", &req.first_name)?;
    let last_name = required("last_name", &req.last_name)?;
    let phone = required("phone", &req.phone)?;

    let code: Option<Uuid> = sqlx::query_scalar(
        r#"
        SELECT registration_code
        FROM centers
        WHERE id = $1
        "#,
    )
    .bind(&req.center_id)
    .fetch_optional(&state.db)
    .await
    .map_err(ApiError::db)?;

    let Some(code) = code else {
        return Err(ApiError::not_found("center"));
    };
    if code != req.secret_code {
        return Err(ApiError::Forbidden(
            "INVALID_SECRET_CODE",
            "Registration code does not match this center".into(),
        ));
    }

    if load_user_by_email(&state, &email).await?.is_some() {
        return Err(ApiError::Conflict(
            "EMAIL_TAKEN",
            "An account with this email already exists".into(),
        ));
    }

    let password_hash = hash_password(&req.password).map_err(ApiError::Internal)?;

    let mut tx = state.db.begin().await.map_err(ApiError::db)?;

    let user: UserRow = sqlx::query_as::<_, UserRow>(
        r#"
        INSERT INTO app_user (user_id, email, password_hash, first_name, last_name, phone, role)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING user_id, email, first_name, last_name, password_hash, role, is_active
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&email)
    .bind(password_hash)
    .bind(first_name)
    .bind(last_name)
    .bind(phone)
    .bind(ROLE_CENTER_ADMIN)
    .fetch_one(&mut *tx)
    .await
    .map_err(ApiError::db)?;

    sqlx::query(
        r#"
        INSERT INTO center_admins (user_id, center_id)
        VALUES ($1, $2)
        "#,
    )
    .bind(user.user_id)
    .bind(&req.center_id)
    .execute(&mut *tx)
    .await
    .map_err(ApiError::db)?;

    tx.commit().await.map_err(ApiError::db)?;

    tracing::info!(user_id = %user.user_id, center_id = %req.center_id, "center admin registered");
    Ok(Json(ApiOk { data: user.profile() }))
}

pub async fn me(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<MeResponse>, ApiError> {
    let user: UserRow = sqlx::query_as::<_, UserRow>(
        r#"
        SELECT user_id, email, first_name, last_name, password_hash, role, is_active
        FROM app_user
        WHERE user_id = $1
        "#,
    )
    .bind(auth.user_id)
    .fetch_optional(&state.db)
    .await
    .map_err(ApiError::db)?
    .ok_or_else(ApiError::session_expired)?;

    let session: SessionTokenRow = sqlx::query_as::<_, SessionTokenRow>(
        r#"
        SELECT session_token_id, expires_at
        FROM session_token
        WHERE session_token_id = $1
          AND revoked_at IS NULL
        "#,
    )
    .bind(auth.session_token_id)
    .fetch_optional(&state.db)
    .await
    .map_err(ApiError::db)?
    .ok_or_else(ApiError::session_expired)?;

    Ok(Json(MeResponse {
        data: MeResponseData {
            user: user.profile(),
            is_super_admin: auth.is_super_admin(),
            center_ids: auth.center_ids,
            session: SessionInfo {
                session_token_id: session.session_token_id,
                expires_at: session.expires_at,
            },
        },
    }))
}

pub async fn logout(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<OkResponse>, ApiError> {
    let rows = sqlx::query(
        r#"
        UPDATE session_token
        SET revoked_at = now()
        WHERE session_token_id = $1
          AND user_id = $2
          AND revoked_at IS NULL
        "#,
    )
    .bind(auth.session_token_id)
    .bind(auth.user_id)
    .execute(&state.db)
    .await
    .map_err(ApiError::db)?;

    if rows.rows_affected() == 0 {
        return Err(ApiError::session_expired());
    }

    Ok(Json(OkResponse::ok()))
}
