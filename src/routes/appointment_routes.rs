// src/routes/appointment_routes.rs

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{delete, get, post},
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    booking::{self, BookingRequest, public_slot},
    error::ApiError,
    lifecycle::{AppointmentAction, AppointmentStatus, Transition},
    middleware::auth_context::{AuthContext, Owned},
    models::{ApiOk, AppState, AppointmentRow, PublicSlotRow, TreatedPatientRow},
    routes::{center_routes::load_snapshot, parse_date},
    snapshot::{CenterEvent, CenterUpdate},
    store::PgStore,
};

const FALLBACK_SERVICE_NAME: &str = "Consulta General";

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/centers/{center_id}/appointments",
            get(list_appointments).post(book_appointment),
        )
        .route("/centers/{center_id}/appointments/public", get(list_public_slots))
        .route("/appointments/{appointment_id}/confirm", post(confirm_appointment))
        .route("/appointments/{appointment_id}/treat", post(treat_appointment))
        .route("/appointments/{appointment_id}", delete(cancel_appointment))
}

/* ============================================================
   Queries
   ============================================================ */

pub(crate) async fn fetch_center_appointments(
    state: &AppState,
    center_id: &str,
) -> Result<Vec<AppointmentRow>, sqlx::Error> {
    sqlx::query_as::<_, AppointmentRow>(
        r#"
        SELECT id, center_id, service_id, patient_name, patient_id, patient_phone,
               date, time, status, created_at
        FROM appointments
        WHERE center_id = $1
        ORDER BY date ASC, created_at ASC
        "#,
    )
    .bind(center_id)
    .fetch_all(&state.db)
    .await
}

#[derive(Debug, Deserialize)]
pub struct PublicSlotsQuery {
    pub from: Option<String>,
}

/// Anonymous view of occupied slots: identities are masked.
pub async fn list_public_slots(
    State(state): State<AppState>,
    Path(center_id): Path<String>,
    Query(q): Query<PublicSlotsQuery>,
) -> Result<Json<ApiOk<Vec<PublicSlotRow>>>, ApiError> {
    let from: NaiveDate = match q.from.as_deref() {
        Some(raw) => parse_date("from", raw)?,
        None => Utc::now().date_naive(),
    };

    let rows = fetch_center_appointments(&state, &center_id)
        .await
        .map_err(ApiError::db)?;

    let slots = rows
        .iter()
        .filter(|a| a.date >= from)
        .map(public_slot)
        .collect();
    Ok(Json(ApiOk { data: slots }))
}

/// Admin: full patient details.
pub async fn list_appointments(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(center_id): Path<String>,
) -> Result<Json<ApiOk<Vec<AppointmentRow>>>, ApiError> {
    auth.ensure_center_admin(&center_id)?;
    let rows = fetch_center_appointments(&state, &center_id)
        .await
        .map_err(ApiError::db)?;
    Ok(Json(ApiOk { data: rows }))
}

/* ============================================================
   POST /centers/{id}/appointments (public booking)
   ============================================================ */

#[derive(Debug, Deserialize)]
pub struct BookAppointmentRequest {
    pub service_id: Uuid,
    pub date: String,
    pub patient_name: String,
    pub patient_id: String,
    pub patient_phone: String,
}

#[derive(Debug, Serialize)]
pub struct BookingConfirmation {
    pub appointment_id: Uuid,
    pub service_id: Uuid,
    pub date: NaiveDate,
    pub time: String,
    pub status: AppointmentStatus,
    pub masked_identity: String,
}

pub async fn book_appointment(
    State(state): State<AppState>,
    Path(center_id): Path<String>,
    Json(req): Json<BookAppointmentRequest>,
) -> Result<Json<ApiOk<CenterUpdate<BookingConfirmation>>>, ApiError> {
    let date = parse_date("date", &req.date)?;
    let before = load_snapshot(&state, &center_id).await?;
    let store = PgStore::new(state.db.clone());

    let row = booking::book(
        &store,
        BookingRequest {
            center_id,
            service_id: req.service_id,
            patient_name: req.patient_name,
            patient_id: req.patient_id,
            patient_phone: req.patient_phone,
            date,
        },
        state.booking_guard,
        Utc::now().date_naive(),
    )
    .await
    .inspect_err(|e| tracing::info!(error = %e, service_id = %req.service_id, "booking refused"))?;

    let slot = public_slot(&row);
    let confirmation = BookingConfirmation {
        appointment_id: row.id,
        service_id: row.service_id,
        date: row.date,
        time: row.time,
        status: row.status,
        masked_identity: slot.masked_identity.clone(),
    };
    Ok(Json(ApiOk {
        data: before.after(confirmation, [CenterEvent::AppointmentBooked(slot)]),
    }))
}

/* ============================================================
   Status transitions
   ============================================================ */

async fn locked_appointment(
    tx: &mut sqlx::PgConnection,
    appointment_id: Uuid,
) -> Result<AppointmentRow, ApiError> {
    sqlx::query_as::<_, AppointmentRow>(
        r#"
        SELECT id, center_id, service_id, patient_name, patient_id, patient_phone,
               date, time, status, created_at
        FROM appointments
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(appointment_id)
    .fetch_optional(tx)
    .await
    .map_err(ApiError::db)?
    .ok_or_else(|| ApiError::not_found("appointment"))
}

pub async fn confirm_appointment(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<ApiOk<AppointmentRow>>, ApiError> {
    auth.ensure_owns(&state, Owned::Appointment, appointment_id).await?;

    let mut tx = state.db.begin().await.map_err(ApiError::db)?;
    let appt = locked_appointment(&mut tx, appointment_id).await?;

    let Transition::SetStatus(next) = appt.status.apply(AppointmentAction::Confirm)? else {
        return Err(ApiError::Internal("confirm must only change status".into()));
    };

    let row = sqlx::query_as::<_, AppointmentRow>(
        r#"
        UPDATE appointments
        SET status = $2
        WHERE id = $1
        RETURNING id, center_id, service_id, patient_name, patient_id, patient_phone,
                  date, time, status, created_at
        "#,
    )
    .bind(appointment_id)
    .bind(next)
    .fetch_one(&mut *tx)
    .await
    .map_err(ApiError::db)?;

    tx.commit().await.map_err(ApiError::db)?;
    Ok(Json(ApiOk { data: row }))
}

fn removed_slot(appt: AppointmentRow) -> CenterEvent {
    CenterEvent::AppointmentRemoved {
        service_id: appt.service_id,
        date: appt.date,
        time: appt.time,
    }
}

pub(crate) fn treatment_note(date: NaiveDate) -> String {
    format!("Atendido desde cita del {}", date.format("%Y-%m-%d"))
}

/// Archive into the treated-patient history, then drop the appointment.
pub async fn treat_appointment(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<ApiOk<CenterUpdate<TreatedPatientRow>>>, ApiError> {
    let center_id = auth.ensure_owns(&state, Owned::Appointment, appointment_id).await?;
    let before = load_snapshot(&state, &center_id).await?;

    let mut tx = state.db.begin().await.map_err(ApiError::db)?;
    let appt = locked_appointment(&mut tx, appointment_id).await?;

    if appt.status.apply(AppointmentAction::Treat)? != Transition::Archive {
        return Err(ApiError::Internal("treat must archive".into()));
    }

    let service_name: Option<String> =
        sqlx::query_scalar("SELECT name FROM services WHERE id = $1")
            .bind(appt.service_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(ApiError::db)?;

    let record = sqlx::query_as::<_, TreatedPatientRow>(
        r#"
        INSERT INTO treated_patients
            (id, center_id, patient_name, patient_id, patient_phone, service_name, treated_at, notes)
        VALUES ($1, $2, $3, $4, $5, $6, now(), $7)
        RETURNING id, center_id, patient_name, patient_id, patient_phone, service_name, treated_at, notes
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&appt.center_id)
    .bind(&appt.patient_name)
    .bind(&appt.patient_id)
    .bind(&appt.patient_phone)
    .bind(service_name.unwrap_or_else(|| FALLBACK_SERVICE_NAME.to_string()))
    .bind(treatment_note(appt.date))
    .fetch_one(&mut *tx)
    .await
    .map_err(ApiError::db)?;

    sqlx::query("DELETE FROM appointments WHERE id = $1")
        .bind(appointment_id)
        .execute(&mut *tx)
        .await
        .map_err(ApiError::db)?;

    tx.commit().await.map_err(ApiError::db)?;

    tracing::info!(%appointment_id, history_id = %record.id, "appointment treated");
    Ok(Json(ApiOk {
        data: before.after(record, [removed_slot(appt)]),
    }))
}

/// Cancel without history.
pub async fn cancel_appointment(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<ApiOk<CenterUpdate<Uuid>>>, ApiError> {
    let center_id = auth.ensure_owns(&state, Owned::Appointment, appointment_id).await?;
    let before = load_snapshot(&state, &center_id).await?;

    let mut tx = state.db.begin().await.map_err(ApiError::db)?;
    let appt = locked_appointment(&mut tx, appointment_id).await?;

    if appt.status.apply(AppointmentAction::Cancel)? != Transition::Delete {
        return Err(ApiError::Internal("cancel must delete".into()));
    }

    sqlx::query("DELETE FROM appointments WHERE id = $1")
        .bind(appointment_id)
        .execute(&mut *tx)
        .await
        .map_err(ApiError::db)?;

    tx.commit().await.map_err(ApiError::db)?;

    tracing::info!(%appointment_id, "appointment cancelled");
    Ok(Json(ApiOk {
        data: before.after(appointment_id, [removed_slot(appt)]),
    }))
}
