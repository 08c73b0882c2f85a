// src/store/memory.rs

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::Barrier;
use uuid::Uuid;

use super::{BookingGuard, BookingStore, NewAppointment, StoreError};
use crate::lifecycle::AppointmentStatus;
use crate::models::{AppointmentRow, ServiceRow};

/// In-process store for exercising the booking path without Postgres.
#[derive(Default)]
pub struct MemoryStore {
    services: Mutex<HashMap<Uuid, ServiceRow>>,
    appointments: Mutex<Vec<AppointmentRow>>,
    /// When set, every read waits here after taking its snapshot, so
    /// concurrent bookings all read before any of them writes.
    read_barrier: Option<Arc<Barrier>>,
}

impl MemoryStore {
    pub fn with_read_barrier(barrier: Arc<Barrier>) -> Self {
        Self {
            read_barrier: Some(barrier),
            ..Self::default()
        }
    }

    pub fn add_service(&self, service: ServiceRow) {
        self.services.lock().unwrap().insert(service.id, service);
    }

    pub fn appointment_count(&self) -> usize {
        self.appointments.lock().unwrap().len()
    }
}

#[async_trait]
impl BookingStore for MemoryStore {
    async fn service(&self, service_id: Uuid) -> Result<Option<ServiceRow>, StoreError> {
        Ok(self.services.lock().unwrap().get(&service_id).cloned())
    }

    async fn appointments_on(
        &self,
        service_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<AppointmentRow>, StoreError> {
        let rows: Vec<AppointmentRow> = self
            .appointments
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.service_id == service_id && a.date == date)
            .cloned()
            .collect();

        if let Some(barrier) = &self.read_barrier {
            barrier.wait().await;
        }
        Ok(rows)
    }

    async fn insert_appointment(
        &self,
        new: NewAppointment,
        guard: BookingGuard,
    ) -> Result<AppointmentRow, StoreError> {
        let capacity = self
            .services
            .lock()
            .unwrap()
            .get(&new.service_id)
            .map(|s| s.daily_capacity)
            .unwrap_or(0);

        let mut appointments = self.appointments.lock().unwrap();

        let mut time = new.time.clone();
        if guard.enforce_capacity {
            let taken = appointments
                .iter()
                .filter(|a| a.service_id == new.service_id && a.date == new.date)
                .count();
            let taken = u32::try_from(taken).unwrap_or(u32::MAX);
            time = new.slot_for(taken, u32::try_from(capacity).unwrap_or(0))?;
        }

        if guard.patient_daily_limit > 0 {
            let today = Utc::now().date_naive();
            let count = appointments
                .iter()
                .filter(|a| {
                    a.center_id == new.center_id
                        && a.patient_id == new.patient_id
                        && a.created_at.date_naive() == today
                })
                .count();
            if count as u64 >= u64::from(guard.patient_daily_limit) {
                return Err(StoreError::DailyLimitExceeded {
                    limit: guard.patient_daily_limit,
                });
            }
        }

        let row = AppointmentRow {
            id: new.id,
            center_id: new.center_id,
            service_id: new.service_id,
            patient_name: new.patient_name,
            patient_id: new.patient_id,
            patient_phone: new.patient_phone,
            date: new.date,
            time,
            status: AppointmentStatus::Pending,
            created_at: Utc::now(),
        };
        appointments.push(row.clone());
        Ok(row)
    }
}
