use clinic_booking_server::{config::Config, db, models::AppState, routes};

use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use axum::http::header;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let cfg = Config::from_env()?;
    let pool = db::connect_pg(&cfg).await?;

    if let Some((email, password)) = &cfg.super_admin {
        db::ensure_super_admin(&pool, email, password).await?;
    }

    tracing::info!(
        enforce_capacity = cfg.booking_guard.enforce_capacity,
        patient_daily_limit = cfg.booking_guard.patient_daily_limit,
        "booking rules"
    );

    let state = AppState {
        db: pool,
        session_ttl_hours: cfg.session_ttl_hours,
        booking_guard: cfg.booking_guard,
    };

    // Public booking pages are served from other origins.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
        ]);

    let app = routes::router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    tracing::info!("Listening on http://{}", cfg.bind_addr);
    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
