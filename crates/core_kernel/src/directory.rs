//! The Directory collaborator
//!
//! The directory is the external source of record for patients and
//! doctors: profile CRUD, registration, and authentication live outside
//! this system. The scheduling and billing domains only ever ask three
//! questions of it, captured by the [`Directory`] trait. Answers are
//! assumed consistent for the duration of a single operation.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

use crate::identifiers::{DoctorId, PatientId};
use crate::ports::PortError;

/// Read-only lookup of patient/doctor existence and doctor availability
#[async_trait]
pub trait Directory: Send + Sync + 'static {
    /// Returns true if the patient is registered
    async fn patient_exists(&self, id: PatientId) -> Result<bool, PortError>;

    /// Returns true if the doctor is registered
    async fn doctor_exists(&self, id: DoctorId) -> Result<bool, PortError>;

    /// Returns true if the doctor is currently accepting appointments
    ///
    /// An unknown doctor is reported as unavailable.
    async fn doctor_available(&self, id: DoctorId) -> Result<bool, PortError>;
}

/// In-memory directory for wiring and tests
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    patients: RwLock<HashSet<PatientId>>,
    doctors: RwLock<HashMap<DoctorId, bool>>,
}

impl InMemoryDirectory {
    /// Creates an empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a patient
    pub async fn add_patient(&self, id: PatientId) {
        self.patients.write().await.insert(id);
    }

    /// Registers a doctor with the given availability flag
    pub async fn add_doctor(&self, id: DoctorId, available: bool) {
        self.doctors.write().await.insert(id, available);
    }

    /// Flips an existing doctor's availability
    pub async fn set_doctor_available(&self, id: DoctorId, available: bool) {
        if let Some(flag) = self.doctors.write().await.get_mut(&id) {
            *flag = available;
        }
    }
}

#[async_trait]
impl Directory for InMemoryDirectory {
    async fn patient_exists(&self, id: PatientId) -> Result<bool, PortError> {
        Ok(self.patients.read().await.contains(&id))
    }

    async fn doctor_exists(&self, id: DoctorId) -> Result<bool, PortError> {
        Ok(self.doctors.read().await.contains_key(&id))
    }

    async fn doctor_available(&self, id: DoctorId) -> Result<bool, PortError> {
        Ok(self
            .doctors
            .read()
            .await
            .get(&id)
            .copied()
            .unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_ids_do_not_exist() {
        let directory = InMemoryDirectory::new();

        assert!(!directory.patient_exists(PatientId::new()).await.unwrap());
        assert!(!directory.doctor_exists(DoctorId::new()).await.unwrap());
        assert!(!directory.doctor_available(DoctorId::new()).await.unwrap());
    }

    #[tokio::test]
    async fn test_registered_patient_exists() {
        let directory = InMemoryDirectory::new();
        let patient = PatientId::new();
        directory.add_patient(patient).await;

        assert!(directory.patient_exists(patient).await.unwrap());
    }

    #[tokio::test]
    async fn test_doctor_availability_toggles() {
        let directory = InMemoryDirectory::new();
        let doctor = DoctorId::new();
        directory.add_doctor(doctor, true).await;

        assert!(directory.doctor_available(doctor).await.unwrap());

        directory.set_doctor_available(doctor, false).await;
        assert!(directory.doctor_exists(doctor).await.unwrap());
        assert!(!directory.doctor_available(doctor).await.unwrap());
    }
}
