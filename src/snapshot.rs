// src/snapshot.rs

//! Immutable per-center state.
//!
//! Every change goes through [`CenterSnapshot::apply`], which returns a new
//! snapshot and leaves the old one untouched.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::{CenterRow, DoctorRow, NewsRow, PublicSlotRow, ServiceRow};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CenterSnapshot {
    pub center: CenterRow,
    pub news: Vec<NewsRow>,
    pub doctors: Vec<DoctorRow>,
    pub services: Vec<ServiceRow>,
    pub appointments: Vec<PublicSlotRow>,
}

/// An admin or booking change: the touched item and the center state after it.
#[derive(Debug, Serialize)]
pub struct CenterUpdate<T> {
    pub item: T,
    pub center: CenterSnapshot,
}

#[derive(Debug, Clone)]
pub enum CenterEvent {
    NewsLoaded(Vec<NewsRow>),
    NewsAdded(NewsRow),
    NewsRemoved(Uuid),
    NewsExpired(DateTime<Utc>),
    DoctorsLoaded(Vec<DoctorRow>),
    DoctorAdded(DoctorRow),
    DoctorRemoved(Uuid),
    ServicesLoaded(Vec<ServiceRow>),
    ServiceAdded(ServiceRow),
    ServicePauseToggled(Uuid),
    ServiceRemoved(Uuid),
    AppointmentsLoaded(Vec<PublicSlotRow>),
    AppointmentBooked(PublicSlotRow),
    AppointmentRemoved { service_id: Uuid, date: chrono::NaiveDate, time: String },
}

impl CenterSnapshot {
    pub fn new(center: CenterRow) -> Self {
        Self {
            center,
            news: vec![],
            doctors: vec![],
            services: vec![],
            appointments: vec![],
        }
    }

    pub fn apply(&self, event: CenterEvent) -> Self {
        let mut next = self.clone();
        match event {
            CenterEvent::NewsLoaded(news) => next.news = news,
            CenterEvent::NewsAdded(item) => next.news.insert(0, item),
            CenterEvent::NewsRemoved(id) => next.news.retain(|n| n.id != id),
            CenterEvent::NewsExpired(now) => next.news.retain(|n| n.expires_at > now),
            CenterEvent::DoctorsLoaded(doctors) => next.doctors = doctors,
            CenterEvent::DoctorAdded(d) => next.doctors.push(d),
            CenterEvent::DoctorRemoved(id) => next.doctors.retain(|d| d.id != id),
            CenterEvent::ServicesLoaded(services) => next.services = services,
            CenterEvent::ServiceAdded(s) => next.services.push(s),
            CenterEvent::ServicePauseToggled(id) => {
                if let Some(s) = next.services.iter_mut().find(|s| s.id == id) {
                    s.is_paused = !s.is_paused;
                }
            }
            CenterEvent::ServiceRemoved(id) => next.services.retain(|s| s.id != id),
            CenterEvent::AppointmentsLoaded(slots) => next.appointments = slots,
            CenterEvent::AppointmentBooked(slot) => next.appointments.push(slot),
            CenterEvent::AppointmentRemoved { service_id, date, time } => {
                if let Some(pos) = next
                    .appointments
                    .iter()
                    .position(|a| a.service_id == service_id && a.date == date && a.time == time)
                {
                    next.appointments.remove(pos);
                }
            }
        }
        next
    }

    pub fn apply_all(&self, events: impl IntoIterator<Item = CenterEvent>) -> Self {
        events
            .into_iter()
            .fold(self.clone(), |snap, ev| snap.apply(ev))
    }

    /// Snapshot after `events`, paired with the item they came from.
    pub fn after<T>(
        &self,
        item: T,
        events: impl IntoIterator<Item = CenterEvent>,
    ) -> CenterUpdate<T> {
        CenterUpdate {
            item,
            center: self.apply_all(events),
        }
    }

    /// Toggle needed to match a stored pause flag; `None` when already in line.
    pub fn pause_change(&self, service_id: Uuid, is_paused: bool) -> Option<CenterEvent> {
        self.services
            .iter()
            .find(|s| s.id == service_id && s.is_paused != is_paused)
            .map(|_| CenterEvent::ServicePauseToggled(service_id))
    }

    /// Services open for booking.
    pub fn active_services(&self) -> impl Iterator<Item = &ServiceRow> {
        self.services.iter().filter(|s| !s.is_paused)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn center() -> CenterRow {
        CenterRow {
            id: "central".into(),
            name: "Centro de Salud Central".into(),
            location: "Av. Principal".into(),
            city: None,
            primary_color: None,
            theme_preset: Some("clinical".into()),
        }
    }

    fn news(title: &str, expires_at: DateTime<Utc>) -> NewsRow {
        NewsRow {
            id: Uuid::new_v4(),
            center_id: "central".into(),
            title: title.into(),
            content: String::new(),
            media_url: None,
            media_type: None,
            created_at: expires_at - Duration::hours(24),
            expires_at,
        }
    }

    fn service(name: &str) -> ServiceRow {
        ServiceRow {
            id: Uuid::new_v4(),
            center_id: "central".into(),
            name: name.into(),
            allowed_days: vec![1, 2, 3, 4, 5],
            daily_capacity: 15,
            is_paused: false,
            start_time: "07:00 AM".into(),
            interval_minutes: 30,
        }
    }

    #[test]
    fn apply_leaves_previous_snapshot_untouched() {
        let now = Utc::now();
        let base = CenterSnapshot::new(center());
        let fresh = news("Vacunación", now + Duration::hours(1));
        let next = base.apply(CenterEvent::NewsAdded(fresh));
        assert!(base.news.is_empty());
        assert_eq!(next.news.len(), 1);
    }

    #[test]
    fn added_news_goes_first_and_expired_news_drops() {
        let now = Utc::now();
        let old = news("Campaña", now - Duration::minutes(1));
        let fresh = news("Horario", now + Duration::hours(2));
        let snap = CenterSnapshot::new(center()).apply_all([
            CenterEvent::NewsLoaded(vec![old.clone()]),
            CenterEvent::NewsAdded(fresh.clone()),
        ]);
        assert_eq!(snap.news[0].id, fresh.id);

        let snap = snap.apply(CenterEvent::NewsExpired(now));
        assert_eq!(snap.news, vec![fresh]);
    }

    #[test]
    fn pause_toggle_hides_service_from_booking() {
        let a = service("Odontología");
        let b = service("Pediatría");
        let snap = CenterSnapshot::new(center())
            .apply(CenterEvent::ServicesLoaded(vec![a.clone(), b.clone()]))
            .apply(CenterEvent::ServicePauseToggled(a.id));

        let active: Vec<_> = snap.active_services().map(|s| s.id).collect();
        assert_eq!(active, vec![b.id]);

        let snap = snap.apply(CenterEvent::ServicePauseToggled(a.id));
        assert_eq!(snap.active_services().count(), 2);
    }

    #[test]
    fn pause_change_only_toggles_when_the_flag_differs() {
        let a = service("Odontología");
        let snap =
            CenterSnapshot::new(center()).apply(CenterEvent::ServicesLoaded(vec![a.clone()]));

        assert!(snap.pause_change(a.id, false).is_none());
        assert!(snap.pause_change(Uuid::new_v4(), true).is_none());

        let update = snap.after(a.id, snap.pause_change(a.id, true));
        assert!(update.center.services[0].is_paused);
        assert!(!snap.services[0].is_paused);
    }

    #[test]
    fn update_carries_item_and_resulting_state() {
        let d = DoctorRow {
            id: Uuid::new_v4(),
            center_id: "central".into(),
            name: "Dra. Vega".into(),
            specialty: "Pediatría".into(),
            description: String::new(),
            image_url: String::new(),
        };
        let base = CenterSnapshot::new(center());
        let added = base.after(d.clone(), [CenterEvent::DoctorAdded(d.clone())]);
        assert_eq!(added.center.doctors, vec![d.clone()]);

        let removed = added.center.after(d.id, [CenterEvent::DoctorRemoved(d.id)]);
        assert_eq!(removed.item, d.id);
        assert!(removed.center.doctors.is_empty());

        let json = serde_json::to_value(&removed).unwrap();
        assert_eq!(json["center"]["center"]["id"], "central");
    }

    #[test]
    fn removing_an_appointment_drops_one_matching_slot() {
        let sid = Uuid::new_v4();
        let date = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let slot = PublicSlotRow {
            service_id: sid,
            date,
            time: "07:00 AM".into(),
            masked_identity: "Ana 17...78".into(),
        };
        let snap = CenterSnapshot::new(center()).apply_all([
            CenterEvent::AppointmentBooked(slot.clone()),
            CenterEvent::AppointmentBooked(slot.clone()),
            CenterEvent::AppointmentRemoved {
                service_id: sid,
                date,
                time: "07:00 AM".into(),
            },
        ]);
        assert_eq!(snap.appointments.len(), 1);
    }
}
