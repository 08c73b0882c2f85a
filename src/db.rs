use std::time::Duration;

use serde::Serialize;
use sqlx::{PgPool, postgres::PgPoolOptions};
use uuid::Uuid;

use crate::auth::hash_password;
use crate::config::Config;
use crate::models::ROLE_SUPER_ADMIN;

pub async fn connect_pg(cfg: &Config) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(cfg.db_max_connections)
        .acquire_timeout(Duration::from_secs(cfg.db_acquire_timeout_secs))
        .connect(&cfg.database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    Ok(pool)
}

/// Create or re-activate the configured super-admin account.
pub async fn ensure_super_admin(pool: &PgPool, email: &str, password: &str) -> anyhow::Result<()> {
    let password_hash = hash_password(password).map_err(anyhow::Error::msg)?;

    sqlx::query(
        r#"
        INSERT INTO app_user (user_id, email, password_hash, role, is_active)
        VALUES ($1, $2, $3, $4, TRUE)
        ON CONFLICT (email)
        DO UPDATE SET password_hash = EXCLUDED.password_hash,
                      role = EXCLUDED.role,
                      is_active = TRUE
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(password_hash)
    .bind(ROLE_SUPER_ADMIN)
    .execute(pool)
    .await?;

    tracing::info!(%email, "super-admin account ready");
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SystemStatus {
    Ok,
    MissingTables,
    ConnectionError,
}

pub async fn system_status(pool: &PgPool) -> SystemStatus {
    let res: Result<Option<String>, sqlx::Error> =
        sqlx::query_scalar("SELECT id FROM centers LIMIT 1")
            .fetch_optional(pool)
            .await;

    match res {
        Ok(Some(_)) => SystemStatus::Ok,
        Ok(None) => SystemStatus::MissingTables,
        Err(e) => {
            let undefined_table = e
                .as_database_error()
                .and_then(|db| db.code())
                .is_some_and(|code| code == "42P01");
            if undefined_table {
                SystemStatus::MissingTables
            } else {
                tracing::error!(error = %e, "status check failed");
                SystemStatus::ConnectionError
            }
        }
    }
}
