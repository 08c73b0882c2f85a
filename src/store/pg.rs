// src/store/pg.rs

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use super::{BookingGuard, BookingStore, NewAppointment, StoreError};
use crate::models::{AppointmentRow, ServiceRow};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookingStore for PgStore {
    async fn service(&self, service_id: Uuid) -> Result<Option<ServiceRow>, StoreError> {
        let row = sqlx::query_as::<_, ServiceRow>(
            r#"
            SELECT id, center_id, name, allowed_days, daily_capacity, is_paused,
                   start_time, interval_minutes
            FROM services
            WHERE id = $1
            "#,
        )
        .bind(service_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn appointments_on(
        &self,
        service_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<AppointmentRow>, StoreError> {
        let rows = sqlx::query_as::<_, AppointmentRow>(
            r#"
            SELECT id, center_id, service_id, patient_name, patient_id, patient_phone,
                   date, time, status, created_at
            FROM appointments
            WHERE service_id = $1
              AND date = $2
            ORDER BY created_at ASC
            "#,
        )
        .bind(service_id)
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn insert_appointment(
        &self,
        new: NewAppointment,
        guard: BookingGuard,
    ) -> Result<AppointmentRow, StoreError> {
        let mut tx = self.pool.begin().await?;

        let mut time = new.time.clone();
        if guard.enforce_capacity {
            // Row lock serializes concurrent bookings for the same service.
            let capacity: i32 = sqlx::query_scalar(
                r#"
                SELECT daily_capacity
                FROM services
                WHERE id = $1
                FOR UPDATE
                "#,
            )
            .bind(new.service_id)
            .fetch_one(&mut *tx)
            .await?;

            let taken: i64 = sqlx::query_scalar(
                r#"
                SELECT COUNT(*)
                FROM appointments
                WHERE service_id = $1
                  AND date = $2
                "#,
            )
            .bind(new.service_id)
            .bind(new.date)
            .fetch_one(&mut *tx)
            .await?;

            let taken = u32::try_from(taken).unwrap_or(u32::MAX);
            let capacity = u32::try_from(capacity).unwrap_or(0);
            time = new.slot_for(taken, capacity).inspect_err(|e| {
                tracing::warn!(
                    service_id = %new.service_id,
                    date = %new.date,
                    error = %e,
                    "slot refused at insert"
                );
            })?;
        }

        if guard.patient_daily_limit > 0 {
            let today_count: i64 = sqlx::query_scalar(
                r#"
                SELECT COUNT(*)
                FROM appointments
                WHERE center_id = $1
                  AND patient_id = $2
                  AND created_at >= date_trunc('day', now())
                "#,
            )
            .bind(&new.center_id)
            .bind(&new.patient_id)
            .fetch_one(&mut *tx)
            .await?;

            if today_count >= i64::from(guard.patient_daily_limit) {
                return Err(StoreError::DailyLimitExceeded {
                    limit: guard.patient_daily_limit,
                });
            }
        }

        let row = sqlx::query_as::<_, AppointmentRow>(
            r#"
            INSERT INTO appointments
                (id, center_id, service_id, patient_name, patient_id, patient_phone, date, time, status)
            VALUES
                ($1, $2, $3, $4, $5, $6, $7, $8, 0)
            RETURNING id, center_id, service_id, patient_name, patient_id, patient_phone,
                      date, time, status, created_at
            "#,
        )
        .bind(new.id)
        .bind(&new.center_id)
        .bind(new.service_id)
        .bind(&new.patient_name)
        .bind(&new.patient_id)
        .bind(&new.patient_phone)
        .bind(new.date)
        .bind(&time)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row)
    }
}
