//! Structured snapshots handed to the external document renderer
//!
//! The renderer (PDF receipts, consultation summaries) lives outside this
//! crate; we only assemble the data it needs. No formatting happens here.

use crate::models::{Appointment, AppointmentDetails, PatientSnapshot, PrescriptionItem, Vitals};
use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Everything a renderer needs to produce a consultation document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    pub appointment_id: Uuid,
    pub reference_number: String,
    pub record_type: String,
    pub scheduled_at: NaiveDateTime,
    pub status: String,
    pub reason: String,
    pub fee: Decimal,
    pub doctor_id: Option<Uuid>,
    pub patient: Option<PatientSnapshot>,
    pub vitals: Option<Vitals>,
    pub diagnosis: Option<String>,
    pub prescriptions: Vec<PrescriptionItem>,
    pub generated_at: DateTime<Utc>,
}

impl DocumentSnapshot {
    pub fn from_appointment(appointment: &Appointment) -> Self {
        let (patient, vitals, diagnosis) = match &appointment.details {
            AppointmentDetails::MedicalCheckup {
                vitals,
                diagnosis,
                patient_snapshot,
                ..
            } => (patient_snapshot.clone(), vitals.clone(), diagnosis.clone()),
            AppointmentDetails::LabVisit {
                patient_snapshot, ..
            } => (patient_snapshot.clone(), None, None),
            AppointmentDetails::PrescriptionRefill { .. } => (None, None, None),
        };

        Self {
            appointment_id: appointment.id,
            reference_number: appointment.reference_number.clone(),
            record_type: appointment.details.record_type().to_string(),
            scheduled_at: appointment.scheduled_at,
            status: appointment.status.to_string(),
            reason: appointment.reason.clone(),
            fee: appointment.fee,
            doctor_id: appointment.doctor_id,
            patient,
            vitals,
            diagnosis,
            prescriptions: appointment.details.prescriptions().to_vec(),
            generated_at: Utc::now(),
        }
    }
}
