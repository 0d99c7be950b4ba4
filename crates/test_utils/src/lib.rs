//! Test Utilities for the Clinic Core
//!
//! Shared fixtures and request builders used by the scheduling and
//! billing test suites. Fixtures provide stable, meaningful defaults
//! (a consultation fee, a slot tomorrow morning); builders let a test
//! override only the fields it cares about.

pub mod builders;
pub mod fixtures;

pub use builders::{AppointmentRequestBuilder, InvoiceRequestBuilder};
pub use fixtures::{MoneyFixtures, TemporalFixtures, TextFixtures};
