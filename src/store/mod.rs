// src/store/mod.rs

//! Data-access boundary for the booking path.

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::models::{AppointmentRow, ServiceRow};
use crate::scheduling::{self, SlotPlan};

#[cfg(test)]
pub mod memory;
pub mod pg;

pub use pg::PgStore;

/// Marker the booking clients look for to tell a per-patient limit apart from
/// other failures. Database triggers raise it too.
pub const DAILY_LIMIT_MARKER: &str = "Límite excedido";

/// Write-time rules applied when an appointment is inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookingGuard {
    /// Re-count under a lock before inserting. Without it two concurrent
    /// bookings for the last slot can both succeed.
    pub enforce_capacity: bool,
    /// Bookings a patient may create per center per day; 0 disables the check.
    pub patient_daily_limit: u32,
}

impl Default for BookingGuard {
    fn default() -> Self {
        Self {
            enforce_capacity: true,
            patient_daily_limit: 5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub id: Uuid,
    pub center_id: String,
    pub service_id: Uuid,
    pub patient_name: String,
    pub patient_id: String,
    pub patient_phone: String,
    pub date: NaiveDate,
    /// Time quoted from the unlocked read.
    pub time: String,
    /// Schedule used to re-derive `time` from the count taken at write time.
    pub plan: SlotPlan,
}

impl NewAppointment {
    /// Time for the booking that finds `taken` slots already held, checked
    /// against the capacity and the end of the day.
    pub fn slot_for(&self, taken: u32, capacity: u32) -> Result<String, StoreError> {
        if taken >= capacity {
            return Err(StoreError::CapacityExceeded(self.service_id));
        }
        let slot = scheduling::slot_time(&self.plan, taken);
        if slot.rolls_over() {
            return Err(StoreError::PastMidnight(self.service_id));
        }
        Ok(slot.to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("service {0} has no capacity left for that date")]
    CapacityExceeded(Uuid),
    #[error("service {0} has no slot left before midnight")]
    PastMidnight(Uuid),
    /// `limit` is 0 when the rule was enforced by the database itself.
    #[error("Límite excedido: daily booking limit per patient reached")]
    DailyLimitExceeded { limit: u32 },
    #[error("db error: {0}")]
    Db(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        let limit_hit = e
            .as_database_error()
            .is_some_and(|db| db.message().contains(DAILY_LIMIT_MARKER));
        if limit_hit {
            StoreError::DailyLimitExceeded { limit: 0 }
        } else {
            StoreError::Db(e)
        }
    }
}

#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn service(&self, service_id: Uuid) -> Result<Option<ServiceRow>, StoreError>;

    /// Appointments already holding a slot for (service, date).
    async fn appointments_on(
        &self,
        service_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<AppointmentRow>, StoreError>;

    /// Persist a pending appointment, applying `guard` atomically with the insert.
    /// With `enforce_capacity` the stored time comes from the locked count, not `new.time`.
    async fn insert_appointment(
        &self,
        new: NewAppointment,
        guard: BookingGuard,
    ) -> Result<AppointmentRow, StoreError>;
}
