//! Test request builders
//!
//! Builders for the scheduling and billing request structs with sensible
//! defaults, so tests specify only the fields under test.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use core_kernel::{AppointmentId, Currency, DoctorId, PatientId};
use domain_billing::{CreateInvoiceRequest, InvoiceItemRequest};
use domain_scheduling::CreateAppointmentRequest;

use crate::fixtures::{TemporalFixtures, TextFixtures};

/// Builder for [`CreateAppointmentRequest`]
pub struct AppointmentRequestBuilder {
    patient_id: PatientId,
    doctor_id: DoctorId,
    start_time: DateTime<Utc>,
    duration_minutes: Option<u32>,
    reason: Option<String>,
    notes: Option<String>,
}

impl Default for AppointmentRequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AppointmentRequestBuilder {
    /// Creates a builder with fresh ids and a slot tomorrow at 09:00
    pub fn new() -> Self {
        Self {
            patient_id: PatientId::new(),
            doctor_id: DoctorId::new(),
            start_time: TemporalFixtures::tomorrow_at(9),
            duration_minutes: None,
            reason: Some(TextFixtures::visit_reason()),
            notes: None,
        }
    }

    /// Sets the patient
    pub fn with_patient(mut self, patient_id: PatientId) -> Self {
        self.patient_id = patient_id;
        self
    }

    /// Sets the doctor
    pub fn with_doctor(mut self, doctor_id: DoctorId) -> Self {
        self.doctor_id = doctor_id;
        self
    }

    /// Sets the start instant
    pub fn with_start_time(mut self, start_time: DateTime<Utc>) -> Self {
        self.start_time = start_time;
        self
    }

    /// Sets the duration
    pub fn with_duration(mut self, minutes: u32) -> Self {
        self.duration_minutes = Some(minutes);
        self
    }

    /// Sets the reason
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Builds the request
    pub fn build(self) -> CreateAppointmentRequest {
        CreateAppointmentRequest {
            patient_id: self.patient_id,
            doctor_id: self.doctor_id,
            start_time: self.start_time,
            duration_minutes: self.duration_minutes,
            reason: self.reason,
            notes: self.notes,
        }
    }
}

/// Builder for [`CreateInvoiceRequest`]
pub struct InvoiceRequestBuilder {
    patient_id: PatientId,
    appointment_id: Option<AppointmentId>,
    currency: Currency,
    due_date: Option<NaiveDate>,
    notes: Option<String>,
    items: Vec<InvoiceItemRequest>,
}

impl Default for InvoiceRequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl InvoiceRequestBuilder {
    /// Creates a builder for a USD invoice with a single 500.00
    /// consultation line
    pub fn new() -> Self {
        Self {
            patient_id: PatientId::new(),
            appointment_id: None,
            currency: Currency::USD,
            due_date: Some(TemporalFixtures::due_in_a_month()),
            notes: None,
            items: vec![InvoiceItemRequest {
                description: "Consultation".to_string(),
                amount: dec!(500.00),
                quantity: None,
            }],
        }
    }

    /// Sets the patient
    pub fn with_patient(mut self, patient_id: PatientId) -> Self {
        self.patient_id = patient_id;
        self
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

    /// Replaces the item lines
    pub fn with_items(mut self, items: Vec<InvoiceItemRequest>) -> Self {
        self.items = items;
        self
    }

    /// Adds a single-quantity item line
    pub fn with_item(mut self, description: impl Into<String>, amount: Decimal) -> Self {
        self.items.push(InvoiceItemRequest {
            description: description.into(),
            amount,
            quantity: None,
        });
        self
    }

    /// Clears the item lines
    pub fn without_items(mut self) -> Self {
        self.items.clear();
        self
    }

    /// Builds the request
    pub fn build(self) -> CreateInvoiceRequest {
        CreateInvoiceRequest {
            patient_id: self.patient_id,
            appointment_id: self.appointment_id,
            currency: self.currency,
            due_date: self.due_date,
            notes: self.notes,
            items: self.items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_appointment_builder_defaults() {
        let request = AppointmentRequestBuilder::new().build();
        assert!(request.start_time > Utc::now());
        assert!(request.duration_minutes.is_none());
        assert!(request.reason.is_some());
    }

    #[test]
    fn test_invoice_builder_defaults() {
        let request = InvoiceRequestBuilder::new().build();
        assert_eq!(request.items.len(), 1);
        assert_eq!(request.items[0].amount, dec!(500.00));
        assert!(request.appointment_id.is_none());
    }
}
