//! Billing domain errors

use thiserror::Error;

use core_kernel::{AppointmentId, Money, MoneyError, PortError};

/// Errors that can occur in the billing domain
///
/// Apart from the not-found variants, every variant is a business-rule
/// violation whose message names the rule and the relevant values.
#[derive(Debug, Error)]
pub enum BillingError {
    /// The referenced entity does not resolve
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// At most one invoice may exist per appointment
    #[error("Appointment {0} already has an invoice")]
    AlreadyInvoiced(AppointmentId),

    /// A fully paid invoice is immutable
    #[error("Cannot update a fully paid invoice")]
    PaidInvoiceImmutable,

    /// The invoice accepts no further payments
    #[error("Invoice is already fully paid")]
    AlreadyPaid,

    /// Cancelled invoices accept no payments
    #[error("Cannot make payment on a cancelled invoice")]
    CancelledInvoice,

    /// The payment would push paid past total
    #[error("Payment amount exceeds remaining balance of {remaining}")]
    ExceedsBalance { remaining: Money },

    /// A paid invoice cannot be voided
    #[error("Cannot cancel a paid invoice")]
    CannotCancelPaid,

    /// Input named a status outside the closed set
    #[error("Unknown invoice status: {0}")]
    UnknownStatus(String),

    /// A supplied value violated a validation rule
    #[error("Validation error: {0}")]
    Validation(String),

    /// Monetary arithmetic failure (currency mismatch)
    #[error(transparent)]
    Money(#[from] MoneyError),

    /// Storage-level failure, including lost concurrent-write races
    #[error(transparent)]
    Store(#[from] PortError),
}

impl BillingError {
    /// Creates a NotFound error
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        BillingError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Returns true if this error means the entity does not exist;
    /// everything else is a bad-request-class failure
    pub fn is_not_found(&self) -> bool {
        match self {
            BillingError::NotFound { .. } => true,
            BillingError::Store(e) => e.is_not_found(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::Currency;
    use rust_decimal_macros::dec;

    #[test]
    fn test_exceeds_balance_reports_amount() {
        let error = BillingError::ExceedsBalance {
            remaining: Money::new(dec!(500), Currency::USD),
        };
        assert!(error.to_string().contains("500.00"));
    }

    #[test]
    fn test_not_found_classification() {
        assert!(BillingError::not_found("Invoice", "INV-9").is_not_found());
        assert!(!BillingError::AlreadyPaid.is_not_found());
    }
}
