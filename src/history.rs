// src/history.rs

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use crate::models::TreatedPatientRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryWindow {
    Today,
    #[default]
    Week,
    All,
}

impl HistoryWindow {
    pub fn contains(self, treated_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match self {
            HistoryWindow::Today => treated_at.date_naive() == now.date_naive(),
            HistoryWindow::Week => treated_at >= now - Duration::days(7),
            HistoryWindow::All => true,
        }
    }
}

/// Records inside `window`, most recent first.
pub fn filter(
    records: Vec<TreatedPatientRow>,
    window: HistoryWindow,
    now: DateTime<Utc>,
) -> Vec<TreatedPatientRow> {
    let mut out: Vec<TreatedPatientRow> = records
        .into_iter()
        .filter(|r| window.contains(r.treated_at, now))
        .collect();
    out.sort_by(|a, b| b.treated_at.cmp(&a.treated_at));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn record(treated_at: DateTime<Utc>) -> TreatedPatientRow {
        TreatedPatientRow {
            id: Uuid::new_v4(),
            center_id: "central".into(),
            patient_name: "Ana".into(),
            patient_id: "1".into(),
            patient_phone: "2".into(),
            service_name: "Rayos X".into(),
            treated_at,
            notes: None,
        }
    }

    #[test]
    fn windows_slice_by_date() {
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 15, 0, 0).unwrap();
        let records = vec![
            record(Utc.with_ymd_and_hms(2026, 3, 10, 0, 30, 0).unwrap()),
            record(Utc.with_ymd_and_hms(2026, 3, 9, 23, 59, 0).unwrap()),
            record(Utc.with_ymd_and_hms(2026, 3, 4, 9, 0, 0).unwrap()),
            record(Utc.with_ymd_and_hms(2026, 2, 1, 9, 0, 0).unwrap()),
        ];

        assert_eq!(filter(records.clone(), HistoryWindow::Today, now).len(), 1);
        assert_eq!(filter(records.clone(), HistoryWindow::Week, now).len(), 3);
        assert_eq!(filter(records, HistoryWindow::All, now).len(), 4);
    }

    #[test]
    fn newest_first() {
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 15, 0, 0).unwrap();
        let older = record(Utc.with_ymd_and_hms(2026, 3, 8, 9, 0, 0).unwrap());
        let newer = record(Utc.with_ymd_and_hms(2026, 3, 9, 9, 0, 0).unwrap());
        let out = filter(vec![older.clone(), newer.clone()], HistoryWindow::All, now);
        assert_eq!(out, vec![newer, older]);
    }

    #[test]
    fn defaults_to_week() {
        assert_eq!(HistoryWindow::default(), HistoryWindow::Week);
        let w: HistoryWindow = serde_json::from_str("\"today\"").unwrap();
        assert_eq!(w, HistoryWindow::Today);
    }
}
