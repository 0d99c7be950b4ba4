//! Port infrastructure shared by storage adapters
//!
//! Each domain defines its own port trait (e.g. `AppointmentStore`,
//! `InvoiceStore`) over the error type here, so adapters (in-memory for
//! tests and wiring, or a database-backed implementation supplied by the
//! host application) report failures uniformly.

use std::fmt;
use thiserror::Error;

/// Error type for port operations
#[derive(Debug, Error)]
pub enum PortError {
    /// The requested entity was not found
    #[error("Not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    /// The operation conflicts with existing data (duplicate key,
    /// occupied slot, or a lost optimistic-concurrency race)
    #[error("Conflict: {message}")]
    Conflict { message: String },

    /// A validation error occurred
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// An internal adapter error occurred
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl PortError {
    /// Creates a NotFound error
    pub fn not_found(entity_type: impl Into<String>, id: impl fmt::Display) -> Self {
        PortError::NotFound {
            entity_type: entity_type.into(),
            id: id.to_string(),
        }
    }

    /// Creates a Conflict error
    pub fn conflict(message: impl Into<String>) -> Self {
        PortError::Conflict {
            message: message.into(),
        }
    }

    /// Creates a Validation error
    pub fn validation(message: impl Into<String>) -> Self {
        PortError::Validation {
            message: message.into(),
        }
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        PortError::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this error indicates the entity was not found
    pub fn is_not_found(&self) -> bool {
        matches!(self, PortError::NotFound { .. })
    }

    /// Returns true if this error indicates a write conflict
    pub fn is_conflict(&self) -> bool {
        matches!(self, PortError::Conflict { .. })
    }
}

/// Marker trait for all domain ports
///
/// Port traits extend this marker so adapters are thread-safe and usable
/// behind `Arc<dyn ...>` in async contexts.
pub trait DomainPort: Send + Sync + 'static {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_classification() {
        let error = PortError::not_found("Appointment", "APT-123");
        assert!(error.is_not_found());
        assert!(!error.is_conflict());
        assert!(error.to_string().contains("Appointment"));
        assert!(error.to_string().contains("APT-123"));
    }

    #[test]
    fn test_conflict_classification() {
        let error = PortError::conflict("slot already booked");
        assert!(error.is_conflict());
        assert!(!error.is_not_found());
        assert!(error.to_string().contains("slot already booked"));
    }
}
