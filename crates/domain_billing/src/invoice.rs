//! Invoice aggregate
//!
//! The invoice exclusively owns its item and payment collections. All
//! mutation goes through aggregate methods that keep the derived state
//! (total, paid amount, payment status) consistent in one step, so no
//! caller can observe an invoice whose amounts and status disagree.

use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

use core_kernel::{AppointmentId, Currency, InvoiceId, Money, PatientId};

use crate::error::BillingError;
use crate::payment::Payment;

/// Invoice payment status
///
/// PENDING, PARTIALLY_PAID, and PAID are derived from the paid amount;
/// CANCELLED is an explicit terminal action and is never unset by
/// recomputation. The set is closed; unknown textual input is rejected
/// via [`FromStr`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    /// Nothing paid yet
    Pending,
    /// Some, but not all, of the total paid
    PartiallyPaid,
    /// Fully paid; the invoice is immutable
    Paid,
    /// Voided; accepts no further payments
    Cancelled,
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InvoiceStatus::Pending => "PENDING",
            InvoiceStatus::PartiallyPaid => "PARTIALLY_PAID",
            InvoiceStatus::Paid => "PAID",
            InvoiceStatus::Cancelled => "CANCELLED",
        };
        write!(f, "{name}")
    }
}

impl FromStr for InvoiceStatus {
    type Err = BillingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(InvoiceStatus::Pending),
            "PARTIALLY_PAID" => Ok(InvoiceStatus::PartiallyPaid),
            "PAID" => Ok(InvoiceStatus::Paid),
            "CANCELLED" => Ok(InvoiceStatus::Cancelled),
            other => Err(BillingError::UnknownStatus(other.to_string())),
        }
    }
}

/// A line item on an invoice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceItem {
    /// Item ID
    pub id: Uuid,
    /// Description of the charge
    pub description: String,
    /// Unit amount
    pub amount: Money,
    /// Quantity (at least 1)
    pub quantity: u32,
}

impl InvoiceItem {
    /// Creates a new item with quantity 1
    pub fn new(description: impl Into<String>, amount: Money) -> Self {
        Self {
            id: Uuid::new_v4(),
            description: description.into(),
            amount,
            quantity: 1,
        }
    }

    /// Sets the quantity
    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }

    /// The total for this line: `amount × quantity`
    pub fn line_total(&self) -> Money {
        self.amount.multiply(Decimal::from(self.quantity))
    }
}

/// An invoice raised against a patient, optionally tied to an appointment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    /// Unique identifier
    pub id: InvoiceId,
    /// Human-readable invoice number, unique and immutable
    pub invoice_number: String,
    /// Patient being billed
    pub patient_id: PatientId,
    /// Appointment this invoice settles, if any (at most one invoice per
    /// appointment)
    pub appointment_id: Option<AppointmentId>,
    /// Currency for all amounts on this invoice
    pub currency: Currency,
    /// Line items
    pub items: Vec<InvoiceItem>,
    /// Payments applied, in recording order
    pub payments: Vec<Payment>,
    /// Total amount: sum of line totals
    pub total_amount: Money,
    /// Running sum of payments
    pub paid_amount: Money,
    /// Status
    pub status: InvoiceStatus,
    /// Due date
    pub due_date: Option<NaiveDate>,
    /// Notes
    pub notes: Option<String>,
    /// Optimistic concurrency token, bumped by the store on save
    pub version: u64,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
    /// Updated timestamp
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    /// Creates an empty PENDING invoice
    pub fn new(invoice_number: String, patient_id: PatientId, currency: Currency) -> Self {
        let now = Utc::now();

        Self {
            id: InvoiceId::new_v7(),
            invoice_number,
            patient_id,
            appointment_id: None,
            currency,
            items: Vec::new(),
            payments: Vec::new(),
            total_amount: Money::zero(currency),
            paid_amount: Money::zero(currency),
            status: InvoiceStatus::Pending,
            due_date: None,
            notes: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Ties the invoice to an appointment
    pub fn with_appointment(mut self, appointment_id: AppointmentId) -> Self {
        self.appointment_id = Some(appointment_id);
        self
    }

    /// Sets the due date
    pub fn with_due_date(mut self, due_date: NaiveDate) -> Self {
        self.due_date = Some(due_date);
        self
    }

    /// Sets the notes
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// The unpaid remainder: `total − paid`
    pub fn remaining_balance(&self) -> Money {
        self.total_amount - self.paid_amount
    }

    /// Replaces the entire item collection and recomputes the total
    ///
    /// The old set is discarded, never merged. Rejected when the new
    /// total would fall below the amount already paid, which would break
    /// the `paid ≤ total` invariant. The payment status is refreshed
    /// afterwards.
    pub fn replace_items(&mut self, items: Vec<InvoiceItem>) -> Result<(), BillingError> {
        let new_total = items
            .iter()
            .fold(Money::zero(self.currency), |acc, item| acc + item.line_total());

        if new_total < self.paid_amount {
            return Err(BillingError::Validation(format!(
                "New items total {} is below the amount already paid {}",
                new_total, self.paid_amount
            )));
        }

        self.items = items;
        self.total_amount = new_total;
        self.refresh_payment_status();
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Applies a payment: validates it, appends it, bumps the paid
    /// amount, and re-derives the status in one step, so no
    /// intermediate state is observable
    pub fn apply_payment(&mut self, payment: Payment) -> Result<(), BillingError> {
        match self.status {
            InvoiceStatus::Paid => return Err(BillingError::AlreadyPaid),
            InvoiceStatus::Cancelled => return Err(BillingError::CancelledInvoice),
            InvoiceStatus::Pending | InvoiceStatus::PartiallyPaid => {}
        }

        if !payment.amount.is_positive() {
            return Err(BillingError::Validation(
                "Payment amount must be positive".to_string(),
            ));
        }

        let remaining = self.remaining_balance();
        let new_paid = self.paid_amount.checked_add(&payment.amount)?;
        if payment.amount > remaining {
            return Err(BillingError::ExceedsBalance { remaining });
        }

        self.paid_amount = new_paid;
        self.payments.push(payment);
        self.refresh_payment_status();
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Voids the invoice; payment history is left untouched
    pub fn cancel(&mut self) -> Result<(), BillingError> {
        if self.status == InvoiceStatus::Paid {
            return Err(BillingError::CannotCancelPaid);
        }
        self.status = InvoiceStatus::Cancelled;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// True when the due date has passed and the invoice still awaits
    /// payment
    pub fn is_overdue(&self, as_of: NaiveDate) -> bool {
        match self.due_date {
            Some(due) => {
                due < as_of
                    && !matches!(self.status, InvoiceStatus::Paid | InvoiceStatus::Cancelled)
            }
            None => false,
        }
    }

    /// Re-derives the payment status from the amounts
    ///
    /// Pure recomputation after every mutation keeps the stored status
    /// from drifting away from the stored amounts. CANCELLED is sticky.
    fn refresh_payment_status(&mut self) {
        if self.status == InvoiceStatus::Cancelled {
            return;
        }
        self.status = if self.paid_amount.is_zero() {
            InvoiceStatus::Pending
        } else if self.paid_amount >= self.total_amount {
            InvoiceStatus::Paid
        } else {
            InvoiceStatus::PartiallyPaid
        };
    }
}

/// Generates unique invoice numbers
///
/// Combines the creation timestamp with a process-wide monotonic
/// counter, so generation is collision-resistant without leaning on a
/// storage-layer constraint and can be tested in isolation.
#[derive(Debug)]
pub struct InvoiceNumberGenerator {
    sequence: AtomicU64,
}

static SHARED_GENERATOR: Lazy<InvoiceNumberGenerator> = Lazy::new(InvoiceNumberGenerator::new);

impl InvoiceNumberGenerator {
    /// Creates a generator starting at sequence zero
    pub fn new() -> Self {
        Self {
            sequence: AtomicU64::new(0),
        }
    }

    /// The process-wide generator used by the ledger
    pub fn shared() -> &'static InvoiceNumberGenerator {
        &SHARED_GENERATOR
    }

    /// Produces the next invoice number
    pub fn next(&self) -> String {
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        format!("INV-{}-{:06}", Utc::now().timestamp_millis(), seq)
    }
}

impl Default for InvoiceNumberGenerator {
    fn default() -> Self {
        Self::new()
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::payment::PaymentMethod;
    use core_kernel::Currency;
    use proptest::prelude::*;
    use rust_decimal::Decimal;

    proptest! {
        /// Random payment sequences can never push paid past total, and
        /// the remaining balance always matches total minus paid.
        #[test]
        fn paid_never_exceeds_total(
            total_minor in 1i64..10_000_00i64,
            amounts in prop::collection::vec(1i64..5_000_00i64, 1..20)
        ) {
            let mut invoice = Invoice::new(
                "INV-prop".to_string(),
                core_kernel::PatientId::new(),
                Currency::USD,
            );
            invoice
                .replace_items(vec![InvoiceItem::new(
                    "Visit",
                    Money::from_minor(total_minor, Currency::USD),
                )])
                .unwrap();

            for minor in amounts {
                let payment = Payment::new(
                    invoice.id,
                    Money::from_minor(minor, Currency::USD),
                    PaymentMethod::Cash,
                );
                // Rejected payments must leave the invoice untouched
                let _ = invoice.apply_payment(payment);

                prop_assert!(invoice.paid_amount.amount() >= Decimal::ZERO);
                prop_assert!(invoice.paid_amount <= invoice.total_amount);
                prop_assert_eq!(
                    invoice.remaining_balance(),
                    invoice.total_amount - invoice.paid_amount
                );
            }
        }

        /// The derived status always agrees with the amounts.
        #[test]
        fn status_tracks_amounts(
            total_minor in 1i64..10_000_00i64,
            amounts in prop::collection::vec(1i64..5_000_00i64, 0..20)
        ) {
            let mut invoice = Invoice::new(
                "INV-prop".to_string(),
                core_kernel::PatientId::new(),
                Currency::USD,
            );
            invoice
                .replace_items(vec![InvoiceItem::new(
                    "Visit",
                    Money::from_minor(total_minor, Currency::USD),
                )])
                .unwrap();

            for minor in amounts {
                let payment = Payment::new(
                    invoice.id,
                    Money::from_minor(minor, Currency::USD),
                    PaymentMethod::Cash,
                );
                let _ = invoice.apply_payment(payment);
            }

            let expected = if invoice.paid_amount.is_zero() {
                InvoiceStatus::Pending
            } else if invoice.paid_amount >= invoice.total_amount {
                InvoiceStatus::Paid
            } else {
                InvoiceStatus::PartiallyPaid
            };
            prop_assert_eq!(invoice.status, expected);
        }
    }
}
