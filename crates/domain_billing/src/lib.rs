//! Billing Domain - Invoicing and Payment Reconciliation
//!
//! This crate owns the invoice ledger for the clinic:
//!
//! - Item-based total computation: `total = Σ(amount × quantity)`,
//!   recomputed from scratch whenever the item set is replaced
//! - Append-only payment recording with a hard `paid ≤ total` invariant
//! - Payment status derived from the amounts by a pure rule
//!   (0 → PENDING, ≥ total → PAID, else PARTIALLY_PAID), with CANCELLED
//!   as an explicit terminal action that recomputation never unsets
//!
//! An invoice may reference at most one appointment, and an appointment
//! may carry at most one invoice; the ledger enforces both directions.
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_billing::{BillingLedger, CreateInvoiceRequest, RecordPaymentRequest};
//!
//! let ledger = BillingLedger::new(directory, invoices, appointments);
//! let invoice = ledger.create_invoice(request).await?;
//! let payment = ledger.record_payment(payment_request).await?;
//! assert!(invoice.remaining_balance().is_positive());
//! ```

pub mod error;
pub mod invoice;
pub mod ledger;
pub mod payment;
pub mod ports;

pub use error::BillingError;
pub use invoice::{Invoice, InvoiceItem, InvoiceNumberGenerator, InvoiceStatus};
pub use ledger::{
    BillingLedger, CreateInvoiceRequest, InvoiceItemRequest, RecordPaymentRequest,
    UpdateInvoiceRequest,
};
pub use payment::{Payment, PaymentMethod};
pub use ports::{memory::InMemoryInvoiceStore, InvoiceStore};
