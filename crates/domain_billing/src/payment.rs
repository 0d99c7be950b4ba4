//! Payment records
//!
//! Payments are append-only facts: once recorded against an invoice they
//! are never edited or deleted. Reconciliation of payments held by a
//! cancelled invoice is outside this core.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{InvoiceId, Money, PaymentId};

/// Payment method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    /// Cash at the desk
    Cash,
    /// Credit card
    CreditCard,
    /// Debit card
    DebitCard,
    /// Bank transfer
    BankTransfer,
    /// Check/cheque
    Check,
    /// Digital wallet
    DigitalWallet,
    /// Insurance payout
    Insurance,
}

/// A payment applied to an invoice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    /// Unique identifier
    pub id: PaymentId,
    /// Invoice being paid
    pub invoice_id: InvoiceId,
    /// Payment amount
    pub amount: Money,
    /// Payment method
    pub method: PaymentMethod,
    /// External reference (bank ref, processor transaction id)
    pub transaction_id: Option<String>,
    /// When the payment was made; defaults to the recording time
    pub paid_at: DateTime<Utc>,
    /// Staff member who took the payment
    pub received_by: Option<String>,
    /// Notes
    pub notes: Option<String>,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
}

impl Payment {
    /// Creates a new payment dated now
    pub fn new(invoice_id: InvoiceId, amount: Money, method: PaymentMethod) -> Self {
        let now = Utc::now();

        Self {
            id: PaymentId::new_v7(),
            invoice_id,
            amount,
            method,
            transaction_id: None,
            paid_at: now,
            received_by: None,
            notes: None,
            created_at: now,
        }
    }

    /// Sets the external transaction reference
    pub fn with_transaction_id(mut self, transaction_id: impl Into<String>) -> Self {
        self.transaction_id = Some(transaction_id.into());
        self
    }

    /// Sets who received the payment
    pub fn with_received_by(mut self, received_by: impl Into<String>) -> Self {
        self.received_by = Some(received_by.into());
        self
    }

    /// Sets the notes
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Overrides the payment date
    pub fn at(mut self, paid_at: DateTime<Utc>) -> Self {
        self.paid_at = paid_at;
        self
    }
}
