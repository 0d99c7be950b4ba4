//! Scheduling Domain - Appointment Lifecycle and Slot Allocation
//!
//! This crate owns the appointment aggregate and its status workflow:
//!
//! - Booking with conflict detection: a doctor can hold at most one
//!   non-terminal appointment per start instant
//! - Rescheduling with partial-field update semantics
//! - Status transitions along a fixed forward-only table
//!   (PENDING → CONFIRMED → COMPLETED, with CANCELLED reachable from any
//!   non-terminal state)
//!
//! Patients and doctors are not owned here; the external
//! [`Directory`](core_kernel::Directory) answers existence and
//! availability questions before any mutation.
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_scheduling::{SchedulingEngine, CreateAppointmentRequest};
//!
//! let engine = SchedulingEngine::new(directory, store);
//! let appointment = engine
//!     .create_appointment(CreateAppointmentRequest {
//!         patient_id,
//!         doctor_id,
//!         start_time,
//!         duration_minutes: None,
//!         reason: Some("Annual checkup".into()),
//!         notes: None,
//!     })
//!     .await?;
//! ```

pub mod appointment;
pub mod engine;
pub mod error;
pub mod ports;

pub use appointment::{Appointment, AppointmentStatus, DEFAULT_DURATION_MINUTES};
pub use engine::{CreateAppointmentRequest, SchedulingEngine, UpdateAppointmentRequest};
pub use error::SchedulingError;
pub use ports::{memory::InMemoryAppointmentStore, AppointmentStore};
