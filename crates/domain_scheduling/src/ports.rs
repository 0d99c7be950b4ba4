//! Scheduling domain ports
//!
//! [`AppointmentStore`] is the persistence port for appointments. The
//! compound invariants live at this seam: `insert` and `save`
//! must enforce slot uniqueness (at most one non-terminal appointment
//! per doctor and start instant) atomically with the write, and `save`
//! must compare-and-swap on the aggregate `version` so racing writers
//! serialize instead of silently overwriting each other. The in-memory
//! adapter in [`memory`] runs both checks under a single write lock; a
//! database adapter would use a partial unique index and a version column.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use core_kernel::{AppointmentId, DoctorId, DomainPort, PatientId, PortError};

use crate::appointment::{Appointment, AppointmentStatus};

/// Persistence port for the appointment aggregate
#[async_trait]
pub trait AppointmentStore: DomainPort {
    /// Inserts a new appointment
    ///
    /// Fails with [`PortError::Conflict`] if the doctor already holds a
    /// non-terminal appointment at the same start instant.
    async fn insert(&self, appointment: Appointment) -> Result<Appointment, PortError>;

    /// Saves an updated appointment
    ///
    /// Compare-and-swap on `version`: fails with [`PortError::Conflict`]
    /// if the stored version differs (a concurrent writer won), or if the
    /// appointment was moved onto an instant another non-terminal
    /// appointment of the same doctor occupies. Returns the stored copy
    /// with the bumped version.
    async fn save(&self, appointment: Appointment) -> Result<Appointment, PortError>;

    /// Retrieves an appointment by id
    async fn get(&self, id: AppointmentId) -> Result<Appointment, PortError>;

    /// Returns true if the doctor holds a non-terminal appointment at
    /// exactly `start_time`
    async fn has_conflict(
        &self,
        doctor_id: DoctorId,
        start_time: DateTime<Utc>,
    ) -> Result<bool, PortError>;

    /// Lists every appointment
    async fn list_all(&self) -> Result<Vec<Appointment>, PortError>;

    /// Lists appointments for a patient
    async fn list_by_patient(&self, patient_id: PatientId) -> Result<Vec<Appointment>, PortError>;

    /// Lists appointments for a doctor
    async fn list_by_doctor(&self, doctor_id: DoctorId) -> Result<Vec<Appointment>, PortError>;

    /// Lists appointments with the given status
    async fn list_by_status(
        &self,
        status: AppointmentStatus,
    ) -> Result<Vec<Appointment>, PortError>;

    /// Lists appointments starting within `[start, end]` (inclusive)
    async fn list_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, PortError>;

    /// Lists a doctor's appointments starting within `[start, end]` (inclusive)
    async fn list_by_doctor_between(
        &self,
        doctor_id: DoctorId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, PortError>;
}

/// In-memory appointment store
pub mod memory {
    use super::*;
    use std::collections::HashMap;
    use tokio::sync::RwLock;

    /// Stores appointments in a map guarded by a single RwLock
    ///
    /// Holding the write lock across the conflict check and the write is
    /// what makes two racing bookings for the same slot serialize: the
    /// loser observes the winner's row and fails the uniqueness check.
    #[derive(Debug, Default)]
    pub struct InMemoryAppointmentStore {
        appointments: RwLock<HashMap<AppointmentId, Appointment>>,
    }

    impl InMemoryAppointmentStore {
        /// Creates an empty store
        pub fn new() -> Self {
            Self::default()
        }

        fn slot_taken(
            appointments: &HashMap<AppointmentId, Appointment>,
            doctor_id: DoctorId,
            start_time: DateTime<Utc>,
            exclude: Option<AppointmentId>,
        ) -> bool {
            appointments.values().any(|a| {
                a.doctor_id == doctor_id
                    && a.start_time == start_time
                    && !a.status.is_terminal()
                    && Some(a.id) != exclude
            })
        }
    }

    impl DomainPort for InMemoryAppointmentStore {}

    #[async_trait]
    impl AppointmentStore for InMemoryAppointmentStore {
        async fn insert(&self, appointment: Appointment) -> Result<Appointment, PortError> {
            let mut appointments = self.appointments.write().await;

            if Self::slot_taken(&appointments, appointment.doctor_id, appointment.start_time, None)
            {
                return Err(PortError::conflict(format!(
                    "doctor {} already booked at {}",
                    appointment.doctor_id, appointment.start_time
                )));
            }

            appointments.insert(appointment.id, appointment.clone());
            Ok(appointment)
        }

        async fn save(&self, mut appointment: Appointment) -> Result<Appointment, PortError> {
            let mut appointments = self.appointments.write().await;

            let stored = appointments
                .get(&appointment.id)
                .ok_or_else(|| PortError::not_found("Appointment", appointment.id))?;

            if stored.version != appointment.version {
                return Err(PortError::conflict(format!(
                    "appointment {} was modified concurrently",
                    appointment.id
                )));
            }

            if Self::slot_taken(
                &appointments,
                appointment.doctor_id,
                appointment.start_time,
                Some(appointment.id),
            ) {
                return Err(PortError::conflict(format!(
                    "doctor {} already booked at {}",
                    appointment.doctor_id, appointment.start_time
                )));
            }

            appointment.version += 1;
            appointments.insert(appointment.id, appointment.clone());
            Ok(appointment)
        }

        async fn get(&self, id: AppointmentId) -> Result<Appointment, PortError> {
            self.appointments
                .read()
                .await
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Appointment", id))
        }

        async fn has_conflict(
            &self,
            doctor_id: DoctorId,
            start_time: DateTime<Utc>,
        ) -> Result<bool, PortError> {
            let appointments = self.appointments.read().await;
            Ok(Self::slot_taken(&appointments, doctor_id, start_time, None))
        }

        async fn list_all(&self) -> Result<Vec<Appointment>, PortError> {
            Ok(self.appointments.read().await.values().cloned().collect())
        }

        async fn list_by_patient(
            &self,
            patient_id: PatientId,
        ) -> Result<Vec<Appointment>, PortError> {
            Ok(self
                .appointments
                .read()
                .await
                .values()
                .filter(|a| a.patient_id == patient_id)
                .cloned()
                .collect())
        }

        async fn list_by_doctor(&self, doctor_id: DoctorId) -> Result<Vec<Appointment>, PortError> {
            Ok(self
                .appointments
                .read()
                .await
                .values()
                .filter(|a| a.doctor_id == doctor_id)
                .cloned()
                .collect())
        }

        async fn list_by_status(
            &self,
            status: AppointmentStatus,
        ) -> Result<Vec<Appointment>, PortError> {
            Ok(self
                .appointments
                .read()
                .await
                .values()
                .filter(|a| a.status == status)
                .cloned()
                .collect())
        }

        async fn list_between(
            &self,
            start: DateTime<Utc>,
            end: DateTime<Utc>,
        ) -> Result<Vec<Appointment>, PortError> {
            Ok(self
                .appointments
                .read()
                .await
                .values()
                .filter(|a| a.start_time >= start && a.start_time <= end)
                .cloned()
                .collect())
        }

        async fn list_by_doctor_between(
            &self,
            doctor_id: DoctorId,
            start: DateTime<Utc>,
            end: DateTime<Utc>,
        ) -> Result<Vec<Appointment>, PortError> {
            Ok(self
                .appointments
                .read()
                .await
                .values()
                .filter(|a| {
                    a.doctor_id == doctor_id && a.start_time >= start && a.start_time <= end
                })
                .cloned()
                .collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::memory::InMemoryAppointmentStore;
    use super::*;
    use chrono::Duration;

    fn appointment_at(doctor_id: DoctorId, start_time: DateTime<Utc>) -> Appointment {
        Appointment::new(PatientId::new(), doctor_id, start_time)
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let store = InMemoryAppointmentStore::new();
        let appointment = appointment_at(DoctorId::new(), Utc::now() + Duration::days(1));

        let inserted = store.insert(appointment.clone()).await.unwrap();
        let fetched = store.get(inserted.id).await.unwrap();
        assert_eq!(fetched.id, appointment.id);
    }

    #[tokio::test]
    async fn test_insert_rejects_occupied_slot() {
        let store = InMemoryAppointmentStore::new();
        let doctor = DoctorId::new();
        let slot = Utc::now() + Duration::days(1);

        store.insert(appointment_at(doctor, slot)).await.unwrap();
        let result = store.insert(appointment_at(doctor, slot)).await;

        assert!(matches!(result, Err(PortError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_terminal_appointment_frees_slot() {
        let store = InMemoryAppointmentStore::new();
        let doctor = DoctorId::new();
        let slot = Utc::now() + Duration::days(1);

        let mut first = store.insert(appointment_at(doctor, slot)).await.unwrap();
        first
            .transition_to(AppointmentStatus::Cancelled)
            .unwrap();
        store.save(first).await.unwrap();

        assert!(store.insert(appointment_at(doctor, slot)).await.is_ok());
    }

    #[tokio::test]
    async fn test_save_rejects_stale_version() {
        let store = InMemoryAppointmentStore::new();
        let appointment = appointment_at(DoctorId::new(), Utc::now() + Duration::days(1));
        let stale = store.insert(appointment).await.unwrap();

        // First writer wins and bumps the version
        let winner = store.save(stale.clone()).await.unwrap();
        assert_eq!(winner.version, stale.version + 1);

        let result = store.save(stale).await;
        assert!(matches!(result, Err(PortError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_save_keeps_own_slot() {
        let store = InMemoryAppointmentStore::new();
        let appointment = appointment_at(DoctorId::new(), Utc::now() + Duration::days(1));
        let mut stored = store.insert(appointment).await.unwrap();

        // Saving without moving must not trip on its own row
        stored.notes = Some("rebooked by phone".into());
        assert!(store.save(stored).await.is_ok());
    }
}
