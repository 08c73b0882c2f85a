// src/lifecycle.rs

use serde::{Deserialize, Serialize};

/// Stored as smallint in `appointments.status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "smallint")]
#[serde(rename_all = "lowercase")]
#[repr(i16)]
pub enum AppointmentStatus {
    Pending = 0,
    Confirmed = 1,
    Treated = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppointmentAction {
    Confirm,
    Treat,
    Cancel,
}

/// What the caller has to persist after a successful transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Update the status column in place.
    SetStatus(AppointmentStatus),
    /// Write a treated-patient record, then delete the appointment.
    Archive,
    /// Delete the appointment without history.
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot {action:?} an appointment that is {from:?}")]
pub struct TransitionError {
    pub from: AppointmentStatus,
    pub action: AppointmentAction,
}

impl AppointmentStatus {
    pub fn apply(self, action: AppointmentAction) -> Result<Transition, TransitionError> {
        use AppointmentAction::*;
        use AppointmentStatus::*;

        match (self, action) {
            (Pending, Confirm) => Ok(Transition::SetStatus(Confirmed)),
            (Pending | Confirmed, Treat) => Ok(Transition::Archive),
            (Pending | Confirmed, Cancel) => Ok(Transition::Delete),
            (Confirmed, Confirm) | (Treated, _) => Err(TransitionError { from: self, action }),
        }
    }
}
