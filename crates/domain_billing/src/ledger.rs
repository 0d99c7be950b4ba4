//! Billing ledger
//!
//! Application service for the invoice lifecycle. Each operation is one
//! unit of work: aggregate methods keep amounts and derived status
//! consistent in memory, and the store's insert/save enforce uniqueness
//! and version checks atomically, so a lost race surfaces as the same
//! bad-request outcome a sequential loser would see.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, instrument};

use core_kernel::{AppointmentId, Currency, Directory, InvoiceId, Money, PatientId};
use domain_scheduling::AppointmentStore;

use crate::error::BillingError;
use crate::invoice::{Invoice, InvoiceItem, InvoiceNumberGenerator, InvoiceStatus};
use crate::payment::{Payment, PaymentMethod};
use crate::ports::InvoiceStore;

/// A line item supplied by the caller
#[derive(Debug, Clone)]
pub struct InvoiceItemRequest {
    /// Description of the charge
    pub description: String,
    /// Unit amount, in the invoice currency (must be positive)
    pub amount: Decimal,
    /// Quantity (defaults to 1, must be at least 1)
    pub quantity: Option<u32>,
}

/// Request for creating a new invoice
#[derive(Debug, Clone)]
pub struct CreateInvoiceRequest {
    /// Patient being billed
    pub patient_id: PatientId,
    /// Appointment this invoice settles, if any
    pub appointment_id: Option<AppointmentId>,
    /// Invoice currency
    pub currency: Currency,
    /// Due date
    pub due_date: Option<NaiveDate>,
    /// Notes
    pub notes: Option<String>,
    /// Line items (an empty list yields a zero-total invoice)
    pub items: Vec<InvoiceItemRequest>,
}

/// Request for updating an invoice; only provided fields change
#[derive(Debug, Clone, Default)]
pub struct UpdateInvoiceRequest {
    /// New due date
    pub due_date: Option<NaiveDate>,
    /// New notes
    pub notes: Option<String>,
    /// Replacement item set; fully replaces the existing items
    pub items: Option<Vec<InvoiceItemRequest>>,
}

/// Request for recording a payment against an invoice
#[derive(Debug, Clone)]
pub struct RecordPaymentRequest {
    /// Invoice being paid
    pub invoice_id: InvoiceId,
    /// Payment amount, in the invoice currency (must be positive and at
    /// most the remaining balance)
    pub amount: Decimal,
    /// Payment method
    pub method: PaymentMethod,
    /// External transaction reference
    pub transaction_id: Option<String>,
    /// Notes
    pub notes: Option<String>,
    /// Staff member who took the payment
    pub received_by: Option<String>,
}

/// Application service owning the invoice ledger
pub struct BillingLedger {
    directory: Arc<dyn Directory>,
    invoices: Arc<dyn InvoiceStore>,
    appointments: Arc<dyn AppointmentStore>,
}

impl BillingLedger {
    /// Creates a new ledger over the given directory and stores
    ///
    /// The appointment store is consulted when an invoice references an
    /// appointment: for existence, for the at-most-one-invoice rule, and
    /// to write the appointment's invoice back-reference.
    pub fn new(
        directory: Arc<dyn Directory>,
        invoices: Arc<dyn InvoiceStore>,
        appointments: Arc<dyn AppointmentStore>,
    ) -> Self {
        Self {
            directory,
            invoices,
            appointments,
        }
    }

    /// Creates a new invoice
    ///
    /// The total is computed from the supplied items; the invoice number
    /// is generated here and never changes. When an appointment is
    /// referenced it must exist and must not already carry an invoice.
    #[instrument(skip(self, request), fields(patient = %request.patient_id))]
    pub async fn create_invoice(
        &self,
        request: CreateInvoiceRequest,
    ) -> Result<Invoice, BillingError> {
        if !self.directory.patient_exists(request.patient_id).await? {
            return Err(BillingError::not_found("Patient", request.patient_id));
        }

        if let Some(appointment_id) = request.appointment_id {
            self.appointments.get(appointment_id).await.map_err(|e| {
                if e.is_not_found() {
                    BillingError::not_found("Appointment", appointment_id)
                } else {
                    BillingError::Store(e)
                }
            })?;

            if self
                .invoices
                .find_by_appointment(appointment_id)
                .await?
                .is_some()
            {
                return Err(BillingError::AlreadyInvoiced(appointment_id));
            }
        }

        let items = build_items(request.currency, request.items)?;

        let mut invoice = Invoice::new(
            InvoiceNumberGenerator::shared().next(),
            request.patient_id,
            request.currency,
        );
        if let Some(appointment_id) = request.appointment_id {
            invoice.appointment_id = Some(appointment_id);
        }
        invoice.due_date = request.due_date;
        invoice.notes = request.notes;
        invoice.replace_items(items)?;

        let invoice = self.invoices.insert(invoice).await.map_err(|e| {
            match (e.is_conflict(), request.appointment_id) {
                // A concurrent creator won the appointment-uniqueness race
                (true, Some(appointment_id)) => BillingError::AlreadyInvoiced(appointment_id),
                _ => BillingError::Store(e),
            }
        })?;

        if let Some(appointment_id) = invoice.appointment_id {
            self.link_appointment(appointment_id, invoice.id).await?;
        }

        info!(invoice = %invoice.id, number = %invoice.invoice_number, "invoice created");
        Ok(invoice)
    }

    /// Updates an invoice; a fully paid invoice is immutable
    ///
    /// A supplied item set fully replaces the current one and the total
    /// is recomputed from scratch.
    #[instrument(skip(self, request))]
    pub async fn update_invoice(
        &self,
        id: InvoiceId,
        request: UpdateInvoiceRequest,
    ) -> Result<Invoice, BillingError> {
        let mut invoice = self.get(id).await?;

        if invoice.status == InvoiceStatus::Paid {
            return Err(BillingError::PaidInvoiceImmutable);
        }

        if let Some(due_date) = request.due_date {
            invoice.due_date = Some(due_date);
        }
        if let Some(notes) = request.notes {
            invoice.notes = Some(notes);
        }
        if let Some(item_requests) = request.items {
            let items = build_items(invoice.currency, item_requests)?;
            invoice.replace_items(items)?;
        }
        invoice.updated_at = Utc::now();

        let invoice = self.invoices.save(invoice).await?;

        info!(invoice = %invoice.id, "invoice updated");
        Ok(invoice)
    }

    /// Voids an invoice; payment history is preserved
    #[instrument(skip(self))]
    pub async fn cancel_invoice(&self, id: InvoiceId) -> Result<Invoice, BillingError> {
        let mut invoice = self.get(id).await?;

        invoice.cancel()?;
        let invoice = self.invoices.save(invoice).await?;

        info!(invoice = %invoice.id, "invoice cancelled");
        Ok(invoice)
    }

    /// Records a payment against an invoice
    ///
    /// Validation, the append, and the status recompute happen in one
    /// aggregate step; persistence is a compare-and-swap per invoice. A
    /// writer that loses the race re-reads the invoice and reports the
    /// accurate rule violation against the fresh balance.
    #[instrument(skip(self, request), fields(invoice = %request.invoice_id))]
    pub async fn record_payment(
        &self,
        request: RecordPaymentRequest,
    ) -> Result<Payment, BillingError> {
        let mut invoice = self.get(request.invoice_id).await?;

        let amount = Money::new(request.amount, invoice.currency);
        let mut payment = Payment::new(invoice.id, amount, request.method);
        payment.transaction_id = request.transaction_id;
        payment.notes = request.notes;
        payment.received_by = request.received_by;
        let payment_record = payment.clone();

        invoice.apply_payment(payment)?;

        match self.invoices.save(invoice).await {
            Ok(saved) => {
                info!(
                    invoice = %saved.id,
                    payment = %payment_record.id,
                    status = %saved.status,
                    "payment recorded"
                );
                Ok(payment_record)
            }
            Err(e) if e.is_conflict() => {
                // Lost the race to a concurrent writer; report against
                // the state that actually won.
                let fresh = self.get(request.invoice_id).await?;
                Err(match fresh.status {
                    InvoiceStatus::Paid => BillingError::AlreadyPaid,
                    InvoiceStatus::Cancelled => BillingError::CancelledInvoice,
                    _ if amount > fresh.remaining_balance() => BillingError::ExceedsBalance {
                        remaining: fresh.remaining_balance(),
                    },
                    _ => BillingError::Store(e),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Retrieves an invoice by id
    pub async fn invoice(&self, id: InvoiceId) -> Result<Invoice, BillingError> {
        self.get(id).await
    }

    /// Looks up an invoice by its unique number
    pub async fn invoice_by_number(&self, invoice_number: &str) -> Result<Invoice, BillingError> {
        self.invoices
            .find_by_number(invoice_number)
            .await?
            .ok_or_else(|| BillingError::not_found("Invoice", invoice_number))
    }

    /// Lists every invoice
    pub async fn invoices(&self) -> Result<Vec<Invoice>, BillingError> {
        Ok(self.invoices.list_all().await?)
    }

    /// Lists a patient's invoices
    pub async fn invoices_for_patient(
        &self,
        patient_id: PatientId,
    ) -> Result<Vec<Invoice>, BillingError> {
        Ok(self.invoices.list_by_patient(patient_id).await?)
    }

    /// Lists invoices with the given status
    pub async fn invoices_with_status(
        &self,
        status: InvoiceStatus,
    ) -> Result<Vec<Invoice>, BillingError> {
        Ok(self.invoices.list_by_status(status).await?)
    }

    /// Lists invoices whose due date has passed and that still await
    /// payment
    pub async fn overdue_invoices(&self) -> Result<Vec<Invoice>, BillingError> {
        Ok(self
            .invoices
            .list_overdue(Utc::now().date_naive())
            .await?)
    }

    /// Lists the payments recorded against an invoice, in order
    pub async fn payments_for_invoice(
        &self,
        invoice_id: InvoiceId,
    ) -> Result<Vec<Payment>, BillingError> {
        Ok(self.get(invoice_id).await?.payments)
    }

    /// Sums payments in the given currency recorded within
    /// `[start, end]` across all invoices
    pub async fn payments_total_between(
        &self,
        currency: Currency,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Money, BillingError> {
        let invoices = self.invoices.list_all().await?;

        let mut total = Money::zero(currency);
        for invoice in &invoices {
            for payment in &invoice.payments {
                if payment.amount.currency() == currency
                    && payment.paid_at >= start
                    && payment.paid_at <= end
                {
                    total = total.checked_add(&payment.amount)?;
                }
            }
        }
        Ok(total)
    }

    async fn get(&self, id: InvoiceId) -> Result<Invoice, BillingError> {
        self.invoices.get(id).await.map_err(|e| {
            if e.is_not_found() {
                BillingError::not_found("Invoice", id)
            } else {
                BillingError::Store(e)
            }
        })
    }

    /// Writes the appointment → invoice back-reference
    ///
    /// Bounded re-read on a lost version race; the store's unique
    /// appointment reference remains the authoritative guard, this only
    /// keeps the appointment record pointing at its invoice.
    async fn link_appointment(
        &self,
        appointment_id: AppointmentId,
        invoice_id: InvoiceId,
    ) -> Result<(), BillingError> {
        let mut attempts = 0;
        loop {
            let mut appointment = self.appointments.get(appointment_id).await?;
            appointment.invoice_id = Some(invoice_id);
            appointment.updated_at = Utc::now();

            match self.appointments.save(appointment).await {
                Ok(_) => return Ok(()),
                Err(e) if e.is_conflict() && attempts < 2 => attempts += 1,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

fn build_items(
    currency: Currency,
    requests: Vec<InvoiceItemRequest>,
) -> Result<Vec<InvoiceItem>, BillingError> {
    let mut items = Vec::with_capacity(requests.len());
    for request in requests {
        if request.description.trim().is_empty() {
            return Err(BillingError::Validation(
                "Item description is required".to_string(),
            ));
        }
        if request.amount <= Decimal::ZERO {
            return Err(BillingError::Validation(
                "Item amount must be positive".to_string(),
            ));
        }
        let quantity = request.quantity.unwrap_or(1);
        if quantity == 0 {
            return Err(BillingError::Validation(
                "Item quantity must be at least 1".to_string(),
            ));
        }

        items.push(
            InvoiceItem::new(request.description, Money::new(request.amount, currency))
                .with_quantity(quantity),
        );
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_build_items_defaults_quantity() {
        let items = build_items(
            Currency::USD,
            vec![InvoiceItemRequest {
                description: "Consultation".into(),
                amount: dec!(150),
                quantity: None,
            }],
        )
        .unwrap();

        assert_eq!(items[0].quantity, 1);
        assert_eq!(items[0].line_total().amount(), dec!(150));
    }

    #[test]
    fn test_build_items_rejects_bad_input() {
        let blank = build_items(
            Currency::USD,
            vec![InvoiceItemRequest {
                description: "  ".into(),
                amount: dec!(10),
                quantity: None,
            }],
        );
        assert!(matches!(blank, Err(BillingError::Validation(_))));

        let negative = build_items(
            Currency::USD,
            vec![InvoiceItemRequest {
                description: "Consultation".into(),
                amount: dec!(-5),
                quantity: None,
            }],
        );
        assert!(matches!(negative, Err(BillingError::Validation(_))));

        let zero_quantity = build_items(
            Currency::USD,
            vec![InvoiceItemRequest {
                description: "Consultation".into(),
                amount: dec!(10),
                quantity: Some(0),
            }],
        );
        assert!(matches!(zero_quantity, Err(BillingError::Validation(_))));
    }
}
