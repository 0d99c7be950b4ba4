//! Scheduling engine
//!
//! Application service for the appointment lifecycle. Every operation is
//! one unit of work against the store: preconditions are checked against
//! the directory first, then the mutation goes through the store, whose
//! insert/save re-run the slot and version checks atomically so a lost
//! race surfaces as the same conflict error a sequential loser would see.

use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;
use tracing::{info, instrument};

use core_kernel::{AppointmentId, Directory, DoctorId, PatientId, PortError};

use crate::appointment::{Appointment, AppointmentStatus};
use crate::error::SchedulingError;
use crate::ports::AppointmentStore;

/// Request for booking a new appointment
#[derive(Debug, Clone)]
pub struct CreateAppointmentRequest {
    /// Patient being seen
    pub patient_id: PatientId,
    /// Doctor to book
    pub doctor_id: DoctorId,
    /// Requested start instant (must be in the future)
    pub start_time: DateTime<Utc>,
    /// Planned length in minutes (defaults to 30)
    pub duration_minutes: Option<u32>,
    /// Reason for the visit
    pub reason: Option<String>,
    /// Booking notes
    pub notes: Option<String>,
}

/// Request for updating an appointment; only provided fields change
#[derive(Debug, Clone, Default)]
pub struct UpdateAppointmentRequest {
    /// New start instant
    pub start_time: Option<DateTime<Utc>>,
    /// New visit reason
    pub reason: Option<String>,
    /// New booking notes
    pub notes: Option<String>,
    /// New duration in minutes
    pub duration_minutes: Option<u32>,
}

/// Application service owning the appointment lifecycle
pub struct SchedulingEngine {
    directory: Arc<dyn Directory>,
    store: Arc<dyn AppointmentStore>,
}

impl SchedulingEngine {
    /// Creates a new engine over the given directory and store
    pub fn new(directory: Arc<dyn Directory>, store: Arc<dyn AppointmentStore>) -> Self {
        Self { directory, store }
    }

    /// Books a new appointment
    ///
    /// Preconditions, checked in order: patient exists, doctor exists,
    /// doctor is available, the slot is free, and the start time lies in
    /// the future. The conflict rule is an exact-instant check per
    /// doctor among non-terminal appointments, not an interval-overlap
    /// check.
    #[instrument(skip(self, request), fields(patient = %request.patient_id, doctor = %request.doctor_id))]
    pub async fn create_appointment(
        &self,
        request: CreateAppointmentRequest,
    ) -> Result<Appointment, SchedulingError> {
        if !self.directory.patient_exists(request.patient_id).await? {
            return Err(SchedulingError::not_found("Patient", request.patient_id));
        }

        if !self.directory.doctor_exists(request.doctor_id).await? {
            return Err(SchedulingError::not_found("Doctor", request.doctor_id));
        }

        if !self.directory.doctor_available(request.doctor_id).await? {
            return Err(SchedulingError::DoctorUnavailable(request.doctor_id));
        }

        if self
            .store
            .has_conflict(request.doctor_id, request.start_time)
            .await?
        {
            return Err(SchedulingError::SlotConflict {
                doctor_id: request.doctor_id,
                start_time: request.start_time,
            });
        }

        if request.start_time <= Utc::now() {
            return Err(SchedulingError::StartTimeInPast(request.start_time));
        }

        let mut appointment =
            Appointment::new(request.patient_id, request.doctor_id, request.start_time);
        if let Some(minutes) = request.duration_minutes {
            appointment.duration_minutes = minutes;
        }
        appointment.reason = request.reason;
        appointment.notes = request.notes;

        let appointment = self
            .store
            .insert(appointment)
            .await
            .map_err(|e| self.slot_conflict_or_store(e, request.doctor_id, request.start_time))?;

        info!(appointment = %appointment.id, "appointment booked");
        Ok(appointment)
    }

    /// Updates a PENDING or CONFIRMED appointment; partial-field semantics
    ///
    /// A new start time must be in the future; the conflict rule is
    /// re-run only when the time actually changes.
    #[instrument(skip(self, request))]
    pub async fn update_appointment(
        &self,
        id: AppointmentId,
        request: UpdateAppointmentRequest,
    ) -> Result<Appointment, SchedulingError> {
        let mut appointment = self.get(id).await?;

        if appointment.status.is_terminal() {
            return Err(SchedulingError::ImmutableAppointment {
                status: appointment.status,
            });
        }

        if let Some(new_time) = request.start_time {
            if new_time <= Utc::now() {
                return Err(SchedulingError::StartTimeInPast(new_time));
            }

            if new_time != appointment.start_time
                && self
                    .store
                    .has_conflict(appointment.doctor_id, new_time)
                    .await?
            {
                return Err(SchedulingError::SlotConflict {
                    doctor_id: appointment.doctor_id,
                    start_time: new_time,
                });
            }

            appointment.start_time = new_time;
        }

        if let Some(reason) = request.reason {
            appointment.reason = Some(reason);
        }
        if let Some(notes) = request.notes {
            appointment.notes = Some(notes);
        }
        if let Some(minutes) = request.duration_minutes {
            appointment.duration_minutes = minutes;
        }
        appointment.updated_at = Utc::now();

        let doctor_id = appointment.doctor_id;
        let start_time = appointment.start_time;
        let appointment = self
            .store
            .save(appointment)
            .await
            .map_err(|e| self.slot_conflict_or_store(e, doctor_id, start_time))?;

        info!(appointment = %appointment.id, "appointment updated");
        Ok(appointment)
    }

    /// Moves an appointment along the status transition table
    ///
    /// `doctor_notes`, when supplied, overwrite the stored notes.
    #[instrument(skip(self, doctor_notes))]
    pub async fn update_status(
        &self,
        id: AppointmentId,
        status: AppointmentStatus,
        doctor_notes: Option<String>,
    ) -> Result<Appointment, SchedulingError> {
        let mut appointment = self.get(id).await?;

        appointment.transition_to(status)?;
        if let Some(notes) = doctor_notes {
            appointment.doctor_notes = Some(notes);
        }

        let appointment = self.store.save(appointment).await?;

        info!(appointment = %appointment.id, status = %status, "appointment status updated");
        Ok(appointment)
    }

    /// Cancels an appointment
    ///
    /// Equivalent to transitioning to CANCELLED and fails with the same
    /// transition error when the appointment is already terminal.
    #[instrument(skip(self))]
    pub async fn cancel_appointment(&self, id: AppointmentId) -> Result<Appointment, SchedulingError> {
        self.update_status(id, AppointmentStatus::Cancelled, None)
            .await
    }

    /// Retrieves an appointment by id
    pub async fn appointment(&self, id: AppointmentId) -> Result<Appointment, SchedulingError> {
        self.get(id).await
    }

    /// Lists every appointment
    pub async fn appointments(&self) -> Result<Vec<Appointment>, SchedulingError> {
        Ok(self.store.list_all().await?)
    }

    /// Lists a patient's appointments
    pub async fn appointments_for_patient(
        &self,
        patient_id: PatientId,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        Ok(self.store.list_by_patient(patient_id).await?)
    }

    /// Lists a doctor's appointments
    pub async fn appointments_for_doctor(
        &self,
        doctor_id: DoctorId,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        Ok(self.store.list_by_doctor(doctor_id).await?)
    }

    /// Lists appointments with the given status
    pub async fn appointments_with_status(
        &self,
        status: AppointmentStatus,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        Ok(self.store.list_by_status(status).await?)
    }

    /// Lists appointments starting on the given date,
    /// within `[00:00:00, 23:59:59]`
    pub async fn appointments_on(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        let (start, end) = day_bounds(date);
        Ok(self.store.list_between(start, end).await?)
    }

    /// Lists a doctor's appointments starting on the given date
    pub async fn doctor_appointments_on(
        &self,
        doctor_id: DoctorId,
        date: NaiveDate,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        let (start, end) = day_bounds(date);
        Ok(self
            .store
            .list_by_doctor_between(doctor_id, start, end)
            .await?)
    }

    async fn get(&self, id: AppointmentId) -> Result<Appointment, SchedulingError> {
        self.store.get(id).await.map_err(|e| {
            if e.is_not_found() {
                SchedulingError::not_found("Appointment", id)
            } else {
                SchedulingError::Store(e)
            }
        })
    }

    /// A conflict from insert/save means another writer took the slot
    /// between our pre-check and the write; surface it as the same
    /// conflict error a sequential loser gets.
    fn slot_conflict_or_store(
        &self,
        error: PortError,
        doctor_id: DoctorId,
        start_time: DateTime<Utc>,
    ) -> SchedulingError {
        if error.is_conflict() {
            SchedulingError::SlotConflict {
                doctor_id,
                start_time,
            }
        } else {
            SchedulingError::Store(error)
        }
    }
}

fn day_bounds(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = date.and_hms_opt(0, 0, 0).expect("midnight is always valid");
    let end = date
        .and_hms_opt(23, 59, 59)
        .expect("end of day is always valid");
    (start.and_utc(), end.and_utc())
}
