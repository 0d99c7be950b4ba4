//! Core Kernel - Foundational types and utilities for the clinic system
//!
//! This crate provides the fundamental building blocks used across the
//! scheduling and billing domains:
//! - Money types with precise decimal arithmetic
//! - Strongly-typed identifiers for clinic entities
//! - Port infrastructure shared by all storage adapters
//! - The read-only Directory collaborator (patient/doctor lookups)

pub mod directory;
pub mod identifiers;
pub mod money;
pub mod ports;

pub use directory::{Directory, InMemoryDirectory};
pub use identifiers::{AppointmentId, DoctorId, InvoiceId, PatientId, PaymentId};
pub use money::{Currency, Money, MoneyError};
pub use ports::{DomainPort, PortError};
