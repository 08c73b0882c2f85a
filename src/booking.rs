// src/booking.rs

//! Quote and book operations.
//!
//! `quote` backs the availability preview and `book` the submission. Both
//! derive the slot from [`crate::scheduling`] using the same store reads.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use uuid::Uuid;

use crate::models::{AppointmentRow, PublicSlotRow, ServiceRow};
use crate::scheduling::{self, ClockParseError, SlotPlan};
use crate::store::{BookingGuard, BookingStore, NewAppointment, StoreError};

const UPCOMING_LIMIT: usize = 5;

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("{0}")]
    Validation(&'static str),
    #[error("service {0} not found")]
    ServiceNotFound(Uuid),
    #[error("service does not belong to this center")]
    WrongCenter,
    #[error("service is paused and not taking bookings")]
    Paused,
    #[error("service does not attend on weekday {weekday} (0 = Sunday)")]
    DayNotAllowed { weekday: u32 },
    #[error("date is in the past")]
    DateInPast,
    #[error("no slots left for that date")]
    FullyBooked,
    #[error("next slot falls past midnight")]
    PastMidnight,
    #[error("service schedule is misconfigured: {0}")]
    Config(#[from] ClockParseError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotQuote {
    pub service_id: Uuid,
    pub date: NaiveDate,
    pub available_slots: u32,
    pub estimated_time: String,
    /// Days past `date` the next slot lands on; non-zero means it rolled over midnight.
    pub day_offset: u32,
    pub interval_minutes: u32,
}

#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub center_id: String,
    pub service_id: Uuid,
    pub patient_name: String,
    pub patient_id: String,
    pub patient_phone: String,
    pub date: NaiveDate,
}

/// Weekday number with Sunday = 0, the numbering `allowed_days` uses.
pub fn weekday_number(date: NaiveDate) -> u32 {
    date.weekday().num_days_from_sunday()
}

pub fn is_allowed_day(service: &ServiceRow, date: NaiveDate) -> bool {
    let wd = weekday_number(date);
    service.allowed_days.iter().any(|d| u32::try_from(*d) == Ok(wd))
}

pub async fn quote<S>(
    store: &S,
    service_id: Uuid,
    date: NaiveDate,
) -> Result<SlotQuote, BookingError>
where
    S: BookingStore + ?Sized,
{
    let service = store
        .service(service_id)
        .await?
        .ok_or(BookingError::ServiceNotFound(service_id))?;
    let plan = SlotPlan::for_service(&service)?;
    let existing = store.appointments_on(service_id, date).await?;

    Ok(quote_from(&plan, date, &existing))
}

fn quote_from(plan: &SlotPlan, date: NaiveDate, existing: &[AppointmentRow]) -> SlotQuote {
    let next = scheduling::estimated_time(plan, date, existing);
    SlotQuote {
        service_id: plan.service_id,
        date,
        available_slots: scheduling::available_slots(plan, date, existing),
        estimated_time: next.to_string(),
        day_offset: next.day_offset,
        interval_minutes: plan.interval_minutes,
    }
}

pub async fn book<S>(
    store: &S,
    req: BookingRequest,
    guard: BookingGuard,
    today: NaiveDate,
) -> Result<AppointmentRow, BookingError>
where
    S: BookingStore + ?Sized,
{
    let patient_name = req.patient_name.trim();
    let patient_id = req.patient_id.trim();
    let patient_phone = req.patient_phone.trim();
    if patient_name.is_empty() {
        return Err(BookingError::Validation("patient_name is required"));
    }
    if patient_id.is_empty() {
        return Err(BookingError::Validation("patient_id is required"));
    }
    if patient_phone.is_empty() {
        return Err(BookingError::Validation("patient_phone is required"));
    }
    if req.date < today {
        return Err(BookingError::DateInPast);
    }

    let service = store
        .service(req.service_id)
        .await?
        .ok_or(BookingError::ServiceNotFound(req.service_id))?;
    if service.center_id != req.center_id {
        return Err(BookingError::WrongCenter);
    }
    if service.is_paused {
        return Err(BookingError::Paused);
    }
    if !is_allowed_day(&service, req.date) {
        return Err(BookingError::DayNotAllowed {
            weekday: weekday_number(req.date),
        });
    }

    let plan = SlotPlan::for_service(&service)?;
    let existing = store.appointments_on(service.id, req.date).await?;
    let quote = quote_from(&plan, req.date, &existing);

    if quote.available_slots == 0 {
        return Err(BookingError::FullyBooked);
    }
    if quote.day_offset > 0 {
        return Err(BookingError::PastMidnight);
    }

    let new = NewAppointment {
        id: Uuid::new_v4(),
        center_id: service.center_id.clone(),
        service_id: service.id,
        patient_name: patient_name.to_string(),
        patient_id: patient_id.to_string(),
        patient_phone: patient_phone.to_string(),
        date: req.date,
        time: quote.estimated_time,
        plan,
    };

    let row = store.insert_appointment(new, guard).await?;
    tracing::info!(
        appointment_id = %row.id,
        service_id = %row.service_id,
        date = %row.date,
        time = %row.time,
        "appointment booked"
    );
    Ok(row)
}

/// "<first name> <first 2 of id>...<last 2 of id>", never the full identity.
pub fn mask_identity(patient_name: &str, patient_id: &str) -> String {
    let first = patient_name.split_whitespace().next().unwrap_or("");
    let chars: Vec<char> = patient_id.chars().collect();
    let head: String = chars.iter().take(2).collect();
    let tail: String = chars[chars.len().saturating_sub(2)..].iter().collect();
    format!("{first} {head}...{tail}")
}

pub fn public_slot(a: &AppointmentRow) -> PublicSlotRow {
    PublicSlotRow {
        service_id: a.service_id,
        date: a.date,
        time: a.time.clone(),
        masked_identity: mask_identity(&a.patient_name, &a.patient_id),
    }
}

/// Next few occupied slots from `today` on, earliest first.
pub fn upcoming(slots: &[PublicSlotRow], today: NaiveDate) -> Vec<PublicSlotRow> {
    let mut out: Vec<PublicSlotRow> = slots.iter().filter(|s| s.date >= today).cloned().collect();
    out.sort_by(|a, b| {
        let ta = a.time.parse::<scheduling::ClockTime>().ok();
        let tb = b.time.parse::<scheduling::ClockTime>().ok();
        a.date.cmp(&b.date).then(ta.cmp(&tb))
    });
    out.truncate(UPCOMING_LIMIT);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use std::sync::Arc;
    use tokio::sync::Barrier;

    // 2026-03-02 is a Monday.
    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
    }

    fn service(capacity: i32, start: &str, interval: i32) -> ServiceRow {
        ServiceRow {
            id: Uuid::new_v4(),
            center_id: "central".into(),
            name: "Medicina General".into(),
            allowed_days: vec![1, 2, 3, 4, 5],
            daily_capacity: capacity,
            is_paused: false,
            start_time: start.into(),
            interval_minutes: interval,
        }
    }

    fn request(svc: &ServiceRow, patient_id: &str) -> BookingRequest {
        BookingRequest {
            center_id: svc.center_id.clone(),
            service_id: svc.id,
            patient_name: "Ana Torres".into(),
            patient_id: patient_id.into(),
            patient_phone: "0991234567".into(),
            date: monday(),
        }
    }

    fn open_guard() -> BookingGuard {
        BookingGuard {
            enforce_capacity: false,
            patient_daily_limit: 0,
        }
    }

    #[tokio::test]
    async fn bookings_take_consecutive_slots() {
        let store = MemoryStore::default();
        let svc = service(3, "07:00 AM", 30);
        store.add_service(svc.clone());

        let mut times = vec![];
        for i in 0..3 {
            let req = request(&svc, &format!("17000000{i}"));
            let row = book(&store, req, BookingGuard::default(), monday())
                .await
                .unwrap();
            assert_eq!(row.status, crate::lifecycle::AppointmentStatus::Pending);
            times.push(row.time);
        }
        assert_eq!(times, ["07:00 AM", "07:30 AM", "08:00 AM"]);

        let err = book(&store, request(&svc, "1799999999"), BookingGuard::default(), monday())
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::FullyBooked));
    }

    #[tokio::test]
    async fn quote_matches_the_booked_time() {
        let store = MemoryStore::default();
        let svc = service(5, "11:45 AM", 30);
        store.add_service(svc.clone());
        book(&store, request(&svc, "0102030405"), open_guard(), monday()).await.unwrap();

        let q = quote(&store, svc.id, monday()).await.unwrap();
        assert_eq!(q.available_slots, 4);
        assert_eq!(q.estimated_time, "12:15 PM");
        assert_eq!(q.day_offset, 0);

        let row = book(&store, request(&svc, "0102030406"), open_guard(), monday()).await.unwrap();
        assert_eq!(row.time, q.estimated_time);
    }

    #[tokio::test]
    async fn quote_for_missing_service_is_not_zero() {
        let store = MemoryStore::default();
        let err = quote(&store, Uuid::new_v4(), monday()).await.unwrap_err();
        assert!(matches!(err, BookingError::ServiceNotFound(_)));
    }

    #[tokio::test]
    async fn rejects_paused_wrong_day_and_past_dates() {
        let store = MemoryStore::default();
        let mut paused = service(5, "07:00 AM", 30);
        paused.is_paused = true;
        let open = service(5, "07:00 AM", 30);
        store.add_service(paused.clone());
        store.add_service(open.clone());

        let err = book(&store, request(&paused, "1"), open_guard(), monday()).await.unwrap_err();
        assert!(matches!(err, BookingError::Paused));

        let mut sunday = request(&open, "1");
        sunday.date = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let err = book(&store, sunday, open_guard(), NaiveDate::from_ymd_opt(2026, 2, 1).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::DayNotAllowed { weekday: 0 }));

        let tomorrow = monday().succ_opt().unwrap();
        let err = book(&store, request(&open, "1"), open_guard(), tomorrow).await.unwrap_err();
        assert!(matches!(err, BookingError::DateInPast));

        let mut other_center = request(&open, "1");
        other_center.center_id = "elsewhere".into();
        let err = book(&store, other_center, open_guard(), monday()).await.unwrap_err();
        assert!(matches!(err, BookingError::WrongCenter));
    }

    #[tokio::test]
    async fn blank_patient_fields_are_rejected() {
        let store = MemoryStore::default();
        let svc = service(5, "07:00 AM", 30);
        store.add_service(svc.clone());

        let mut req = request(&svc, "1");
        req.patient_phone = "   ".into();
        let err = book(&store, req, open_guard(), monday()).await.unwrap_err();
        assert!(matches!(err, BookingError::Validation(_)));
        assert_eq!(store.appointment_count(), 0);
    }

    #[tokio::test]
    async fn slot_past_midnight_is_refused() {
        let store = MemoryStore::default();
        let svc = service(5, "11:00 PM", 60);
        store.add_service(svc.clone());

        book(&store, request(&svc, "1"), open_guard(), monday()).await.unwrap();
        let q = quote(&store, svc.id, monday()).await.unwrap();
        assert_eq!(q.estimated_time, "12:00 AM");
        assert_eq!(q.day_offset, 1);

        let err = book(&store, request(&svc, "2"), open_guard(), monday()).await.unwrap_err();
        assert!(matches!(err, BookingError::PastMidnight));
    }

    #[tokio::test]
    async fn malformed_start_time_surfaces_as_config_error() {
        let store = MemoryStore::default();
        let svc = service(5, "7 o'clock", 30);
        store.add_service(svc.clone());

        let err = quote(&store, svc.id, monday()).await.unwrap_err();
        assert!(matches!(err, BookingError::Config(_)));
    }

    #[tokio::test]
    async fn patient_daily_limit_is_enforced() {
        let store = MemoryStore::default();
        let svc = service(10, "07:00 AM", 30);
        store.add_service(svc.clone());
        let guard = BookingGuard {
            enforce_capacity: true,
            patient_daily_limit: 2,
        };

        for _ in 0..2 {
            book(&store, request(&svc, "0912345678"), guard, monday()).await.unwrap();
        }
        let err = book(&store, request(&svc, "0912345678"), guard, monday()).await.unwrap_err();
        assert!(err.to_string().contains(crate::store::DAILY_LIMIT_MARKER));

        // other patients are unaffected
        book(&store, request(&svc, "0987654321"), guard, monday()).await.unwrap();
    }

    async fn race_for_last_slot(guard: BookingGuard) -> (usize, MemoryStore) {
        let store = MemoryStore::with_read_barrier(Arc::new(Barrier::new(2)));
        let svc = service(1, "07:00 AM", 30);
        store.add_service(svc.clone());

        let (a, b) = tokio::join!(
            book(&store, request(&svc, "1111111111"), guard, monday()),
            book(&store, request(&svc, "2222222222"), guard, monday()),
        );
        let succeeded = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
        (succeeded, store)
    }

    #[tokio::test]
    async fn concurrent_bookings_overrun_capacity_without_write_time_check() {
        let (succeeded, store) = race_for_last_slot(open_guard()).await;
        assert_eq!(succeeded, 2);
        assert_eq!(store.appointment_count(), 2);
    }

    #[tokio::test]
    async fn write_time_capacity_check_closes_the_race() {
        let guard = BookingGuard {
            enforce_capacity: true,
            patient_daily_limit: 0,
        };
        let (succeeded, store) = race_for_last_slot(guard).await;
        assert_eq!(succeeded, 1);
        assert_eq!(store.appointment_count(), 1);
    }

    #[tokio::test]
    async fn concurrent_bookings_get_distinct_times_under_write_time_check() {
        let store = MemoryStore::with_read_barrier(Arc::new(Barrier::new(3)));
        let svc = service(2, "07:00 AM", 30);
        store.add_service(svc.clone());
        let guard = BookingGuard {
            enforce_capacity: true,
            patient_daily_limit: 0,
        };

        let (a, b, c) = tokio::join!(
            book(&store, request(&svc, "1111111111"), guard, monday()),
            book(&store, request(&svc, "2222222222"), guard, monday()),
            book(&store, request(&svc, "3333333333"), guard, monday()),
        );

        let mut times = vec![];
        let mut refused = vec![];
        for result in [a, b, c] {
            match result {
                Ok(row) => times.push(row.time),
                Err(e) => refused.push(crate::error::ApiError::from(e)),
            }
        }
        times.sort();
        assert_eq!(times, ["07:00 AM", "07:30 AM"]);
        assert_eq!(refused.len(), 1);
        assert_eq!(refused[0].code(), "FULLY_BOOKED");
        assert_eq!(store.appointment_count(), 2);
    }

    #[tokio::test]
    async fn write_time_check_refuses_a_slot_past_midnight() {
        let store = MemoryStore::with_read_barrier(Arc::new(Barrier::new(2)));
        let svc = service(5, "11:00 PM", 60);
        store.add_service(svc.clone());
        let guard = BookingGuard {
            enforce_capacity: true,
            patient_daily_limit: 0,
        };

        let (a, b) = tokio::join!(
            book(&store, request(&svc, "1111111111"), guard, monday()),
            book(&store, request(&svc, "2222222222"), guard, monday()),
        );

        let (ok, err) = match (a, b) {
            (Ok(row), Err(e)) | (Err(e), Ok(row)) => (row, e),
            other => panic!("expected one booking and one refusal, got {other:?}"),
        };
        assert_eq!(ok.time, "11:00 PM");
        assert!(matches!(err, BookingError::Store(StoreError::PastMidnight(_))));
        assert_eq!(crate::error::ApiError::from(err).code(), "SLOT_PAST_MIDNIGHT");
    }

    #[test]
    fn masks_identity_for_public_listing() {
        assert_eq!(mask_identity("Ana María Torres", "1712345678"), "Ana 17...78");
        assert_eq!(mask_identity("Luis", "7"), "Luis 7...7");
    }

    #[test]
    fn upcoming_skips_past_dates_and_caps_the_list() {
        let today = monday();
        let sid = Uuid::new_v4();
        let slot = |d: NaiveDate, t: &str| PublicSlotRow {
            service_id: sid,
            date: d,
            time: t.into(),
            masked_identity: "x".into(),
        };
        let mut slots = vec![slot(today.pred_opt().unwrap(), "07:00 AM")];
        for t in ["09:00 AM", "07:30 AM", "01:00 PM", "07:00 AM", "08:00 AM", "10:00 AM"] {
            slots.push(slot(today, t));
        }

        let list = upcoming(&slots, today);
        let times: Vec<&str> = list.iter().map(|s| s.time.as_str()).collect();
        assert_eq!(times, ["07:00 AM", "07:30 AM", "08:00 AM", "09:00 AM", "10:00 AM"]);
    }
}
