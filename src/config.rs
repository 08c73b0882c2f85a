use std::env;

use crate::store::BookingGuard;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub session_ttl_hours: i64,
    pub db_max_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub booking_guard: BookingGuard,
    /// (email, password) of the super-admin to create at startup, if any.
    pub super_admin: Option<(String, String)>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        Ok(Self::from_lookup(database_url, |k| env::var(k).ok()))
    }

    fn from_lookup(database_url: String, get: impl Fn(&str) -> Option<String>) -> Self {
        let bind_addr = get("BIND_ADDR").unwrap_or_else(|| "127.0.0.1:8080".to_string());
        let session_ttl_hours = parsed(&get, "SESSION_TTL_HOURS").unwrap_or(24);
        let db_max_connections = parsed(&get, "DB_MAX_CONNECTIONS").unwrap_or(10);
        let db_acquire_timeout_secs = parsed(&get, "DB_ACQUIRE_TIMEOUT_SECS").unwrap_or(5);

        let defaults = BookingGuard::default();
        let booking_guard = BookingGuard {
            enforce_capacity: parsed(&get, "ENFORCE_CAPACITY").unwrap_or(defaults.enforce_capacity),
            patient_daily_limit: parsed(&get, "PATIENT_DAILY_LIMIT")
                .unwrap_or(defaults.patient_daily_limit),
        };

        let super_admin = match (get("SUPER_ADMIN_EMAIL"), get("SUPER_ADMIN_PASSWORD")) {
            (Some(email), Some(password)) if !email.trim().is_empty() && !password.is_empty() => {
                Some((email.trim().to_lowercase(), password))
            }
            _ => None,
        };

        Self {
            database_url,
            bind_addr,
            session_ttl_hours,
            db_max_connections,
            db_acquire_timeout_secs,
            booking_guard,
            super_admin,
        }
    }
}

fn parsed<T: std::str::FromStr>(get: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    get(key).and_then(|s| s.trim().parse::<T>().ok())
}
