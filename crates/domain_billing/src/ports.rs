//! Billing domain ports
//!
//! [`InvoiceStore`] is the persistence port for invoices. As with the
//! scheduling store, the compound invariants sit at this seam: `insert`
//! enforces uniqueness of the invoice number and of the appointment
//! reference (at most one invoice per appointment), and `save` is a
//! compare-and-swap on `version` so concurrent payment writers
//! serialize. The in-memory adapter runs everything under one write
//! lock; a database adapter would use unique indexes and a version
//! column.

use async_trait::async_trait;
use chrono::NaiveDate;

use core_kernel::{AppointmentId, DomainPort, InvoiceId, PatientId, PortError};

use crate::invoice::{Invoice, InvoiceStatus};

/// Persistence port for the invoice aggregate
#[async_trait]
pub trait InvoiceStore: DomainPort {
    /// Inserts a new invoice
    ///
    /// Fails with [`PortError::Conflict`] if the invoice number is taken
    /// or the referenced appointment already has an invoice.
    async fn insert(&self, invoice: Invoice) -> Result<Invoice, PortError>;

    /// Saves an updated invoice
    ///
    /// Compare-and-swap on `version`: fails with [`PortError::Conflict`]
    /// if the stored version differs. Returns the stored copy with the
    /// bumped version.
    async fn save(&self, invoice: Invoice) -> Result<Invoice, PortError>;

    /// Retrieves an invoice by id
    async fn get(&self, id: InvoiceId) -> Result<Invoice, PortError>;

    /// Looks up an invoice by its unique number
    async fn find_by_number(&self, invoice_number: &str) -> Result<Option<Invoice>, PortError>;

    /// Looks up the invoice tied to an appointment, if any
    async fn find_by_appointment(
        &self,
        appointment_id: AppointmentId,
    ) -> Result<Option<Invoice>, PortError>;

    /// Lists every invoice
    async fn list_all(&self) -> Result<Vec<Invoice>, PortError>;

    /// Lists a patient's invoices
    async fn list_by_patient(&self, patient_id: PatientId) -> Result<Vec<Invoice>, PortError>;

    /// Lists invoices with the given status
    async fn list_by_status(&self, status: InvoiceStatus) -> Result<Vec<Invoice>, PortError>;

    /// Lists invoices whose due date lies strictly before `as_of` and
    /// that still await payment
    async fn list_overdue(&self, as_of: NaiveDate) -> Result<Vec<Invoice>, PortError>;
}

/// In-memory invoice store
pub mod memory {
    use super::*;
    use std::collections::HashMap;
    use tokio::sync::RwLock;

    /// Stores invoices in a map guarded by a single RwLock
    #[derive(Debug, Default)]
    pub struct InMemoryInvoiceStore {
        invoices: RwLock<HashMap<InvoiceId, Invoice>>,
    }

    impl InMemoryInvoiceStore {
        /// Creates an empty store
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl DomainPort for InMemoryInvoiceStore {}

    #[async_trait]
    impl InvoiceStore for InMemoryInvoiceStore {
        async fn insert(&self, invoice: Invoice) -> Result<Invoice, PortError> {
            let mut invoices = self.invoices.write().await;

            if invoices
                .values()
                .any(|i| i.invoice_number == invoice.invoice_number)
            {
                return Err(PortError::conflict(format!(
                    "invoice number {} already exists",
                    invoice.invoice_number
                )));
            }

            if let Some(appointment_id) = invoice.appointment_id {
                if invoices
                    .values()
                    .any(|i| i.appointment_id == Some(appointment_id))
                {
                    return Err(PortError::conflict(format!(
                        "appointment {appointment_id} already has an invoice"
                    )));
                }
            }

            invoices.insert(invoice.id, invoice.clone());
            Ok(invoice)
        }

        async fn save(&self, mut invoice: Invoice) -> Result<Invoice, PortError> {
            let mut invoices = self.invoices.write().await;

            let stored = invoices
                .get(&invoice.id)
                .ok_or_else(|| PortError::not_found("Invoice", invoice.id))?;

            if stored.version != invoice.version {
                return Err(PortError::conflict(format!(
                    "invoice {} was modified concurrently",
                    invoice.id
                )));
            }

            invoice.version += 1;
            invoices.insert(invoice.id, invoice.clone());
            Ok(invoice)
        }

        async fn get(&self, id: InvoiceId) -> Result<Invoice, PortError> {
            self.invoices
                .read()
                .await
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Invoice", id))
        }

        async fn find_by_number(
            &self,
            invoice_number: &str,
        ) -> Result<Option<Invoice>, PortError> {
            Ok(self
                .invoices
                .read()
                .await
                .values()
                .find(|i| i.invoice_number == invoice_number)
                .cloned())
        }

        async fn find_by_appointment(
            &self,
            appointment_id: AppointmentId,
        ) -> Result<Option<Invoice>, PortError> {
            Ok(self
                .invoices
                .read()
                .await
                .values()
                .find(|i| i.appointment_id == Some(appointment_id))
                .cloned())
        }

        async fn list_all(&self) -> Result<Vec<Invoice>, PortError> {
            Ok(self.invoices.read().await.values().cloned().collect())
        }

        async fn list_by_patient(&self, patient_id: PatientId) -> Result<Vec<Invoice>, PortError> {
            Ok(self
                .invoices
                .read()
                .await
                .values()
                .filter(|i| i.patient_id == patient_id)
                .cloned()
                .collect())
        }

        async fn list_by_status(&self, status: InvoiceStatus) -> Result<Vec<Invoice>, PortError> {
            Ok(self
                .invoices
                .read()
                .await
                .values()
                .filter(|i| i.status == status)
                .cloned()
                .collect())
        }

        async fn list_overdue(&self, as_of: NaiveDate) -> Result<Vec<Invoice>, PortError> {
            Ok(self
                .invoices
                .read()
                .await
                .values()
                .filter(|i| i.is_overdue(as_of))
                .cloned()
                .collect())
        }
    }
}
