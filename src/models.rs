use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::lifecycle::AppointmentStatus;
use crate::store::BookingGuard;

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub session_ttl_hours: i64,
    pub booking_guard: BookingGuard,
}

/* -------------------------
   API DTOs
--------------------------*/

#[derive(Debug, Serialize)]
pub struct ApiOk<T> {
    pub data: T,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    pub device_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub data: LoginResponseData,
}

#[derive(Debug, Serialize)]
pub struct LoginResponseData {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserProfile,
}

#[derive(Debug, Deserialize)]
pub struct RegisterAdminRequest {
    pub email: String,
    pub password: String,
    pub center_id: String,
    pub secret_code: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub data: MeResponseData,
}

#[derive(Debug, Serialize)]
pub struct MeResponseData {
    pub user: UserProfile,
    pub is_super_admin: bool,
    pub center_ids: Vec<String>,
    pub session: SessionInfo,
}

#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub data: OkData,
}

#[derive(Debug, Serialize)]
pub struct OkData {
    pub ok: bool,
}

impl OkResponse {
    pub fn ok() -> Self {
        OkResponse {
            data: OkData { ok: true },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserProfile {
    pub user_id: Uuid,
    pub email: String,
    pub display_name: String,
    pub role: String,
}

#[derive(Debug, Serialize)]
pub struct SessionInfo {
    pub session_token_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/* -------------------------
   DB Row Models
--------------------------*/

#[derive(Debug, sqlx::FromRow)]
pub struct UserRow {
    pub user_id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub role: i16,
    pub is_active: bool,
}

impl UserRow {
    pub fn profile(&self) -> UserProfile {
        let display_name = format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string();
        UserProfile {
            user_id: self.user_id,
            email: self.email.clone(),
            display_name: if display_name.is_empty() {
                self.email.clone()
            } else {
                display_name
            },
            role: role_to_string(self.role),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct SessionTokenRow {
    pub session_token_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct CenterRow {
    pub id: String,
    pub name: String,
    pub location: String,
    pub city: Option<String>,
    pub primary_color: Option<String>,
    pub theme_preset: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct NewsRow {
    pub id: Uuid,
    pub center_id: String,
    pub title: String,
    pub content: String,
    pub media_url: Option<String>,
    pub media_type: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct DoctorRow {
    pub id: Uuid,
    pub center_id: String,
    pub name: String,
    pub specialty: String,
    pub description: String,
    pub image_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ServiceRow {
    pub id: Uuid,
    pub center_id: String,
    pub name: String,
    /// Weekday numbers, 0 = Sunday.
    pub allowed_days: Vec<i16>,
    pub daily_capacity: i32,
    pub is_paused: bool,
    pub start_time: String,
    pub interval_minutes: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct AppointmentRow {
    pub id: Uuid,
    pub center_id: String,
    pub service_id: Uuid,
    pub patient_name: String,
    pub patient_id: String,
    pub patient_phone: String,
    pub date: NaiveDate,
    pub time: String,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
}

/// Occupied slot as shown to anonymous visitors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicSlotRow {
    pub service_id: Uuid,
    pub date: NaiveDate,
    pub time: String,
    pub masked_identity: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct TreatedPatientRow {
    pub id: Uuid,
    pub center_id: String,
    pub patient_name: String,
    pub patient_id: String,
    pub patient_phone: String,
    pub service_name: String,
    pub treated_at: DateTime<Utc>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AdminTenureRow {
    pub user_id: Uuid,
    pub center_id: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub is_active: bool,
    pub days_in_office: i32,
}

/* -------------------------
   Helpers
--------------------------*/

pub const ROLE_CENTER_ADMIN: i16 = 0;
pub const ROLE_SUPER_ADMIN: i16 = 1;

pub fn role_to_string(role: i16) -> String {
    match role {
        ROLE_CENTER_ADMIN => "center_admin",
        ROLE_SUPER_ADMIN => "super_admin",
        _ => "unknown",
    }
    .to_string()
}
