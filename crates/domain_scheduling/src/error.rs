//! Scheduling domain errors

use chrono::{DateTime, Utc};
use thiserror::Error;

use core_kernel::{DoctorId, PortError};

use crate::appointment::AppointmentStatus;

/// Errors that can occur in the scheduling domain
///
/// Everything other than the not-found variants is a business-rule
/// violation scoped to the single request; nothing here is retried.
#[derive(Debug, Error)]
pub enum SchedulingError {
    /// The referenced entity does not resolve
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The doctor is not currently accepting appointments
    #[error("Doctor {0} is not available for appointments")]
    DoctorUnavailable(DoctorId),

    /// The doctor already holds a non-terminal appointment at this instant
    #[error("Doctor {doctor_id} already has an appointment at {start_time}")]
    SlotConflict {
        doctor_id: DoctorId,
        start_time: DateTime<Utc>,
    },

    /// Appointments can only be booked into the future
    #[error("Appointment time {0} must be in the future")]
    StartTimeInPast(DateTime<Utc>),

    /// Completed and cancelled appointments are immutable
    #[error("Cannot update a {status} appointment")]
    ImmutableAppointment { status: AppointmentStatus },

    /// The requested status change is not in the transition table
    #[error("Cannot transition from {from} to {to}")]
    InvalidStatusTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    /// Input named a status outside the closed set
    #[error("Unknown appointment status: {0}")]
    UnknownStatus(String),

    /// Storage-level failure, including lost concurrent-write races
    #[error(transparent)]
    Store(#[from] PortError),
}

impl SchedulingError {
    /// Creates a NotFound error
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        SchedulingError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Returns true if this error means the entity does not exist;
    /// everything else is a bad-request-class failure
    pub fn is_not_found(&self) -> bool {
        match self {
            SchedulingError::NotFound { .. } => true,
            SchedulingError::Store(e) => e.is_not_found(),
            _ => false,
        }
    }
}
