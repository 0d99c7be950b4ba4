//! Appointment aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{AppointmentId, DoctorId, InvoiceId, PatientId};

use crate::error::SchedulingError;

/// Default appointment length in minutes
pub const DEFAULT_DURATION_MINUTES: u32 = 30;

/// Appointment status
///
/// The status set is closed; unrecognized textual input is rejected at
/// the boundary via [`FromStr`], never coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    /// Booked, awaiting confirmation
    Pending,
    /// Confirmed by the clinic
    Confirmed,
    /// Visit took place
    Completed,
    /// Called off; the slot is released
    Cancelled,
}

impl AppointmentStatus {
    /// Returns true if no further transition is permitted from this status
    pub fn is_terminal(&self) -> bool {
        matches!(self, AppointmentStatus::Completed | AppointmentStatus::Cancelled)
    }

    /// Checks whether the transition to `target` is allowed
    pub fn can_transition_to(&self, target: AppointmentStatus) -> bool {
        use AppointmentStatus::*;
        matches!(
            (*self, target),
            (Pending, Confirmed) | (Pending, Cancelled) | (Confirmed, Completed) | (Confirmed, Cancelled)
        )
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AppointmentStatus::Pending => "PENDING",
            AppointmentStatus::Confirmed => "CONFIRMED",
            AppointmentStatus::Completed => "COMPLETED",
            AppointmentStatus::Cancelled => "CANCELLED",
        };
        write!(f, "{name}")
    }
}

impl FromStr for AppointmentStatus {
    type Err = SchedulingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(AppointmentStatus::Pending),
            "CONFIRMED" => Ok(AppointmentStatus::Confirmed),
            "COMPLETED" => Ok(AppointmentStatus::Completed),
            "CANCELLED" => Ok(AppointmentStatus::Cancelled),
            other => Err(SchedulingError::UnknownStatus(other.to_string())),
        }
    }
}

/// A booked time slot with a doctor
///
/// Appointments reference their patient, doctor, and (at most one)
/// invoice by identifier only; none of those entities are owned here.
/// Cancellation is a status, not a removal: appointments are never
/// physically deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    /// Unique identifier
    pub id: AppointmentId,
    /// Patient being seen
    pub patient_id: PatientId,
    /// Doctor holding the slot
    pub doctor_id: DoctorId,
    /// Scheduled start instant
    pub start_time: DateTime<Utc>,
    /// Planned length in minutes
    pub duration_minutes: u32,
    /// Status
    pub status: AppointmentStatus,
    /// Reason for the visit
    pub reason: Option<String>,
    /// Notes from the booking party
    pub notes: Option<String>,
    /// Notes recorded by the doctor
    pub doctor_notes: Option<String>,
    /// Invoice raised for this appointment, if any
    pub invoice_id: Option<InvoiceId>,
    /// Optimistic concurrency token, bumped by the store on save
    pub version: u64,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
    /// Updated timestamp
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// Creates a new PENDING appointment with the default duration
    pub fn new(patient_id: PatientId, doctor_id: DoctorId, start_time: DateTime<Utc>) -> Self {
        let now = Utc::now();

        Self {
            id: AppointmentId::new_v7(),
            patient_id,
            doctor_id,
            start_time,
            duration_minutes: DEFAULT_DURATION_MINUTES,
            status: AppointmentStatus::Pending,
            reason: None,
            notes: None,
            doctor_notes: None,
            invoice_id: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the duration
    pub fn with_duration(mut self, minutes: u32) -> Self {
        self.duration_minutes = minutes;
        self
    }

    /// Sets the visit reason
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Sets the booking notes
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Moves the appointment to `target` if the transition table allows it
    pub fn transition_to(&mut self, target: AppointmentStatus) -> Result<(), SchedulingError> {
        if !self.status.can_transition_to(target) {
            return Err(SchedulingError::InvalidStatusTransition {
                from: self.status,
                to: target,
            });
        }
        self.status = target;
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn pending_appointment() -> Appointment {
        Appointment::new(
            PatientId::new(),
            DoctorId::new(),
            Utc::now() + Duration::days(1),
        )
    }

    #[test]
    fn test_new_defaults() {
        let appointment = pending_appointment();

        assert_eq!(appointment.status, AppointmentStatus::Pending);
        assert_eq!(appointment.duration_minutes, DEFAULT_DURATION_MINUTES);
        assert!(appointment.invoice_id.is_none());
        assert!(appointment.doctor_notes.is_none());
        assert_eq!(appointment.version, 0);
    }

    #[test]
    fn test_allowed_transitions() {
        let mut appointment = pending_appointment();

        appointment.transition_to(AppointmentStatus::Confirmed).unwrap();
        assert_eq!(appointment.status, AppointmentStatus::Confirmed);

        appointment.transition_to(AppointmentStatus::Completed).unwrap();
        assert_eq!(appointment.status, AppointmentStatus::Completed);
    }

    #[test]
    fn test_pending_cannot_complete_directly() {
        let mut appointment = pending_appointment();

        let result = appointment.transition_to(AppointmentStatus::Completed);
        assert!(matches!(
            result,
            Err(SchedulingError::InvalidStatusTransition {
                from: AppointmentStatus::Pending,
                to: AppointmentStatus::Completed,
            })
        ));
        assert_eq!(appointment.status, AppointmentStatus::Pending);
    }

    #[test]
    fn test_terminal_states_reject_everything() {
        for terminal in [AppointmentStatus::Completed, AppointmentStatus::Cancelled] {
            for target in [
                AppointmentStatus::Pending,
                AppointmentStatus::Confirmed,
                AppointmentStatus::Completed,
                AppointmentStatus::Cancelled,
            ] {
                assert!(!terminal.can_transition_to(target));
            }
            assert!(terminal.is_terminal());
        }
    }

    #[test]
    fn test_cancel_from_either_active_state() {
        let mut pending = pending_appointment();
        pending.transition_to(AppointmentStatus::Cancelled).unwrap();

        let mut confirmed = pending_appointment();
        confirmed.transition_to(AppointmentStatus::Confirmed).unwrap();
        confirmed.transition_to(AppointmentStatus::Cancelled).unwrap();
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!(
            "CONFIRMED".parse::<AppointmentStatus>().unwrap(),
            AppointmentStatus::Confirmed
        );
        assert!(matches!(
            "NO_SHOW".parse::<AppointmentStatus>(),
            Err(SchedulingError::UnknownStatus(_))
        ));
        // Wire names are the uppercase forms only
        assert!("pending".parse::<AppointmentStatus>().is_err());
    }

    #[test]
    fn test_status_serde_names() {
        let json = serde_json::to_string(&AppointmentStatus::Cancelled).unwrap();
        assert_eq!(json, "\"CANCELLED\"");
    }
}
