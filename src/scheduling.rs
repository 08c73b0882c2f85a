// src/scheduling.rs

//! Slot allocation for a service on a given day.
//!
//! Every booking for a (service, date) pair gets the next fixed-interval slot
//! after the service's start time: the first booking gets the start time, the
//! second gets start + interval, and so on. Both the availability preview and
//! the booking path go through [`available_slots`] and [`estimated_time`] so
//! the two can never disagree.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::models::{AppointmentRow, PublicSlotRow, ServiceRow};

pub const DEFAULT_START_TIME: &str = "07:00 AM";
pub const DEFAULT_INTERVAL_MINUTES: u32 = 30;

const MINUTES_PER_DAY: u32 = 24 * 60;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClockParseError {
    #[error("time must look like \"hh:mm AM\" or \"hh:mm PM\", got {0:?}")]
    Format(String),
    #[error("time out of range: {0:?}")]
    OutOfRange(String),
}

/// Time of day, stored on a 24h clock and rendered as "hh:mm AM|PM".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ClockTime {
    hour: u32,
    minute: u32,
}

impl ClockTime {
    pub fn from_hm(hour: u32, minute: u32) -> Option<Self> {
        (hour < 24 && minute < 60).then_some(Self { hour, minute })
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn minute(&self) -> u32 {
        self.minute
    }

    fn minutes_since_midnight(&self) -> u32 {
        self.hour * 60 + self.minute
    }
}

impl FromStr for ClockTime {
    type Err = ClockParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let format_err = || ClockParseError::Format(raw.to_string());

        let (clock, meridiem) = raw.split_once(' ').ok_or_else(format_err)?;
        let (h, m) = clock.split_once(':').ok_or_else(format_err)?;
        if h.is_empty() || m.len() != 2 {
            return Err(format_err());
        }
        let mut hour: u32 = h.parse().map_err(|_| format_err())?;
        let minute: u32 = m.parse().map_err(|_| format_err())?;

        if !(1..=12).contains(&hour) || minute > 59 {
            return Err(ClockParseError::OutOfRange(raw.to_string()));
        }

        match meridiem.trim() {
            "PM" if hour < 12 => hour += 12,
            "AM" if hour == 12 => hour = 0,
            "AM" | "PM" => {}
            _ => return Err(format_err()),
        }

        Ok(Self { hour, minute })
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let meridiem = if self.hour >= 12 { "PM" } else { "AM" };
        let display_hour = match self.hour % 12 {
            0 => 12,
            h => h,
        };
        write!(f, "{display_hour:02}:{:02} {meridiem}", self.minute)
    }
}

/// Slot assigned to a booking.
///
/// `time` is wrapped onto a 24h clock; `day_offset` counts how many times the
/// schedule crossed midnight to get there. Anything but 0 means the slot does
/// not belong to the requested date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EstimatedTime {
    pub time: ClockTime,
    pub day_offset: u32,
}

impl EstimatedTime {
    pub fn rolls_over(&self) -> bool {
        self.day_offset > 0
    }
}

impl fmt::Display for EstimatedTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.time, f)
    }
}

/// Anything that occupies a slot: full appointment rows or the masked public rows.
pub trait BookedSlot {
    fn service_id(&self) -> Uuid;
    fn date(&self) -> NaiveDate;
}

impl BookedSlot for AppointmentRow {
    fn service_id(&self) -> Uuid {
        self.service_id
    }
    fn date(&self) -> NaiveDate {
        self.date
    }
}

impl BookedSlot for PublicSlotRow {
    fn service_id(&self) -> Uuid {
        self.service_id
    }
    fn date(&self) -> NaiveDate {
        self.date
    }
}

/// Parsed schedule of a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotPlan {
    pub service_id: Uuid,
    pub daily_capacity: u32,
    pub start: ClockTime,
    pub interval_minutes: u32,
}

impl SlotPlan {
    pub fn for_service(service: &ServiceRow) -> Result<Self, ClockParseError> {
        let start = if service.start_time.trim().is_empty() {
            DEFAULT_START_TIME
        } else {
            service.start_time.as_str()
        };

        Ok(Self {
            service_id: service.id,
            daily_capacity: u32::try_from(service.daily_capacity).unwrap_or(0),
            start: start.parse()?,
            interval_minutes: effective_interval(service.interval_minutes),
        })
    }
}

/// Non-positive intervals fall back to the default.
pub fn effective_interval(interval_minutes: i32) -> u32 {
    match u32::try_from(interval_minutes) {
        Ok(0) | Err(_) => DEFAULT_INTERVAL_MINUTES,
        Ok(m) => m,
    }
}

pub fn slots_taken<B: BookedSlot>(service_id: Uuid, date: NaiveDate, existing: &[B]) -> u32 {
    let n = existing
        .iter()
        .filter(|b| b.service_id() == service_id && b.date() == date)
        .count();
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// Remaining capacity for (service, date). Never negative.
pub fn available_slots<B: BookedSlot>(plan: &SlotPlan, date: NaiveDate, existing: &[B]) -> u32 {
    plan.daily_capacity
        .saturating_sub(slots_taken(plan.service_id, date, existing))
}

/// Time the next booking for (service, date) would receive.
pub fn estimated_time<B: BookedSlot>(
    plan: &SlotPlan,
    date: NaiveDate,
    existing: &[B],
) -> EstimatedTime {
    slot_time(plan, slots_taken(plan.service_id, date, existing))
}

/// Time of the booking with 0-based index `slot_index` in the day.
pub fn slot_time(plan: &SlotPlan, slot_index: u32) -> EstimatedTime {
    let total = u64::from(plan.start.minutes_since_midnight())
        + u64::from(slot_index) * u64::from(plan.interval_minutes);

    let day = u64::from(MINUTES_PER_DAY);
    let within_day = (total % day) as u32;

    EstimatedTime {
        time: ClockTime {
            hour: within_day / 60,
            minute: within_day % 60,
        },
        day_offset: u32::try_from(total / day).unwrap_or(u32::MAX),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(start: &str, interval: u32, capacity: u32) -> SlotPlan {
        SlotPlan {
            service_id: Uuid::new_v4(),
            daily_capacity: capacity,
            start: start.parse().unwrap(),
            interval_minutes: interval,
        }
    }

    fn booked(service_id: Uuid, date: NaiveDate, n: usize) -> Vec<PublicSlotRow> {
        (0..n)
            .map(|_| PublicSlotRow {
                service_id,
                date,
                time: String::new(),
                masked_identity: String::new(),
            })
            .collect()
    }

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn parses_twelve_hour_clock() {
        let t: ClockTime = "07:00 AM".parse().unwrap();
        assert_eq!((t.hour(), t.minute()), (7, 0));
        let t: ClockTime = "12:00 AM".parse().unwrap();
        assert_eq!((t.hour(), t.minute()), (0, 0));
        let t: ClockTime = "12:30 PM".parse().unwrap();
        assert_eq!((t.hour(), t.minute()), (12, 30));
        let t: ClockTime = "01:05 PM".parse().unwrap();
        assert_eq!((t.hour(), t.minute()), (13, 5));
    }

    #[test]
    fn rejects_malformed_times() {
        for bad in [
            "", "7", "07:00", "07-00 AM", "7:0 AM", "13:00 PM", "00:10 AM", "07:60 AM", "07:00 XM",
            "aa:bb AM",
        ] {
            assert!(bad.parse::<ClockTime>().is_err(), "{bad:?} should not parse");
        }
    }

    #[test]
    fn renders_back_to_twelve_hour_clock() {
        assert_eq!(ClockTime::from_hm(0, 5).unwrap().to_string(), "12:05 AM");
        assert_eq!(ClockTime::from_hm(12, 0).unwrap().to_string(), "12:00 PM");
        assert_eq!(ClockTime::from_hm(18, 45).unwrap().to_string(), "06:45 PM");
        assert!(ClockTime::from_hm(24, 0).is_none());
    }

    #[test]
    fn available_slots_clamps_at_zero() {
        let p = plan("07:00 AM", 30, 3);
        let d = day("2026-03-02");
        for n in 0..=3 {
            assert_eq!(available_slots(&p, d, &booked(p.service_id, d, n)), 3 - n as u32);
        }
        assert_eq!(available_slots(&p, d, &booked(p.service_id, d, 7)), 0);
    }

    #[test]
    fn only_same_service_and_date_count() {
        let p = plan("07:00 AM", 30, 2);
        let d = day("2026-03-02");
        let mut existing = booked(p.service_id, day("2026-03-03"), 4);
        existing.extend(booked(Uuid::new_v4(), d, 4));
        assert_eq!(available_slots(&p, d, &existing), 2);
        assert_eq!(estimated_time(&p, d, &existing).to_string(), "07:00 AM");
    }

    #[test]
    fn slots_follow_the_interval() {
        let p = plan("07:00 AM", 30, 10);
        let d = day("2026-03-02");
        let times: Vec<String> = (0..3)
            .map(|n| estimated_time(&p, d, &booked(p.service_id, d, n)).to_string())
            .collect();
        assert_eq!(times, ["07:00 AM", "07:30 AM", "08:00 AM"]);
    }

    #[test]
    fn estimated_time_is_deterministic() {
        let p = plan("09:15 AM", 20, 10);
        let d = day("2026-03-02");
        let existing = booked(p.service_id, d, 4);
        assert_eq!(estimated_time(&p, d, &existing), estimated_time(&p, d, &existing));
    }

    #[test]
    fn crossing_noon_keeps_twelve() {
        let p = plan("11:45 AM", 30, 10);
        assert_eq!(slot_time(&p, 1).to_string(), "12:15 PM");
        assert!(!slot_time(&p, 1).rolls_over());
    }

    #[test]
    fn crossing_midnight_is_flagged() {
        let p = plan("11:00 PM", 60, 10);
        let t = slot_time(&p, 2);
        assert_eq!(t.to_string(), "01:00 AM");
        assert_eq!(t.day_offset, 1);
        assert!(t.rolls_over());
    }

    #[test]
    fn zero_interval_falls_back_to_default() {
        assert_eq!(effective_interval(0), 30);
        assert_eq!(effective_interval(-5), 30);
        assert_eq!(effective_interval(45), 45);
    }

    #[test]
    fn plan_defaults_empty_start_time() {
        let svc = ServiceRow {
            id: Uuid::new_v4(),
            center_id: "c1".into(),
            name: "General".into(),
            allowed_days: vec![1, 2, 3, 4, 5],
            daily_capacity: 15,
            is_paused: false,
            start_time: "  ".into(),
            interval_minutes: 0,
        };
        let p = SlotPlan::for_service(&svc).unwrap();
        assert_eq!(p.start.to_string(), "07:00 AM");
        assert_eq!(p.interval_minutes, 30);
        assert_eq!(p.daily_capacity, 15);
    }
}
