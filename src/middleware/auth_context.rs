use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use uuid::Uuid;

use crate::auth::hash_access_token;
use crate::error::ApiError;
use crate::models::{AppState, ROLE_SUPER_ADMIN};

#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub role: i16,
    pub session_token_id: Uuid,
    /// Centers with an active tenure for this user.
    pub center_ids: Vec<String>,
}

#[derive(Debug, sqlx::FromRow)]
struct SessionLookupRow {
    session_token_id: Uuid,
    user_id: Uuid,
    role: i16,
}

/// Tables whose rows belong to a single center.
#[derive(Debug, Clone, Copy)]
pub enum Owned {
    News,
    Doctor,
    Service,
    Appointment,
    TreatedPatient,
}

impl Owned {
    fn table(self) -> &'static str {
        match self {
            Owned::News => "news",
            Owned::Doctor => "doctors",
            Owned::Service => "services",
            Owned::Appointment => "appointments",
            Owned::TreatedPatient => "treated_patients",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Owned::News => "news item",
            Owned::Doctor => "doctor",
            Owned::Service => "service",
            Owned::Appointment => "appointment",
            Owned::TreatedPatient => "history record",
        }
    }
}

impl AuthContext {
    pub fn is_super_admin(&self) -> bool {
        self.role == ROLE_SUPER_ADMIN
    }

    pub fn can_manage(&self, center_id: &str) -> bool {
        self.is_super_admin() || self.center_ids.iter().any(|c| c == center_id)
    }

    pub fn ensure_super_admin(&self) -> Result<(), ApiError> {
        if self.is_super_admin() {
            Ok(())
        } else {
            Err(ApiError::Forbidden(
                "FORBIDDEN",
                "Only the super-admin can manage centers".into(),
            ))
        }
    }

    pub fn ensure_center_admin(&self, center_id: &str) -> Result<(), ApiError> {
        if self.can_manage(center_id) {
            Ok(())
        } else {
            Err(ApiError::Forbidden(
                "FORBIDDEN",
                format!("You are not an administrator of center {center_id}"),
            ))
        }
    }

    /// Look up the center owning `id` and check this user administers it.
    pub async fn ensure_owns(
        &self,
        state: &AppState,
        kind: Owned,
        id: Uuid,
    ) -> Result<String, ApiError> {
        let sql = format!("SELECT center_id FROM {} WHERE id = $1", kind.table());
        let center_id: String = sqlx::query_scalar(&sql)
            .bind(id)
            .fetch_optional(&state.db)
            .await
            .map_err(ApiError::db)?
            .ok_or_else(|| ApiError::not_found(kind.label()))?;

        self.ensure_center_admin(&center_id)?;
        Ok(center_id)
    }
}

impl FromRequestParts<AppState> for AuthContext {
    type Rejection = ApiError;

    fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        async move {
            let TypedHeader(authz): TypedHeader<Authorization<Bearer>> =
                TypedHeader::from_request_parts(parts, state)
                    .await
                    .map_err(|_| ApiError::session_expired())?;

            let token_hash = hash_access_token(authz.token());

            let row: SessionLookupRow = sqlx::query_as::<_, SessionLookupRow>(
                r#"
                SELECT st.session_token_id, st.user_id, u.role
                FROM session_token st
                JOIN app_user u ON u.user_id = st.user_id
                WHERE st.session_token_hash = $1
                  AND st.revoked_at IS NULL
                  AND st.expires_at > now()
                  AND u.is_active = true
                "#,
            )
            .bind(&token_hash)
            .fetch_optional(&state.db)
            .await
            .map_err(ApiError::db)?
            .ok_or_else(ApiError::session_expired)?;

            let center_ids: Vec<String> = sqlx::query_scalar(
                r#"
                SELECT center_id
                FROM center_admins
                WHERE user_id = $1
                  AND is_active = true
                ORDER BY center_id
                "#,
            )
            .bind(row.user_id)
            .fetch_all(&state.db)
            .await
            .map_err(ApiError::db)?;

            // best-effort
            let _ = sqlx::query(
                r#"
                UPDATE session_token
                SET last_seen_at = now()
                WHERE session_token_id = $1
                "#,
            )
            .bind(row.session_token_id)
            .execute(&state.db)
            .await;

            Ok(AuthContext {
                user_id: row.user_id,
                role: row.role,
                session_token_id: row.session_token_id,
                center_ids,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ROLE_CENTER_ADMIN;

    fn ctx(role: i16, centers: &[&str]) -> AuthContext {
        AuthContext {
            user_id: Uuid::new_v4(),
            role,
            session_token_id: Uuid::new_v4(),
            center_ids: centers.iter().map(|c| c.to_string()).collect(),
        }
    }

    #[test]
    fn center_admin_is_scoped_to_own_centers() {
        let admin = ctx(ROLE_CENTER_ADMIN, &["central"]);
        assert!(admin.ensure_center_admin("central").is_ok());
        assert!(admin.ensure_center_admin("norte").is_err());
        assert!(admin.ensure_super_admin().is_err());
    }

    #[test]
    fn super_admin_manages_everything() {
        let root = ctx(ROLE_SUPER_ADMIN, &[]);
        assert!(root.ensure_center_admin("norte").is_ok());
        assert!(root.ensure_super_admin().is_ok());
    }
}
