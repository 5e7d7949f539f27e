use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(AppointmentStatus::Pending),
            "confirmed" => Some(AppointmentStatus::Confirmed),
            "completed" => Some(AppointmentStatus::Completed),
            "cancelled" => Some(AppointmentStatus::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Vitals {
    pub height_cm: Option<f32>,
    pub weight_kg: Option<f32>,
    pub blood_pressure: Option<String>,
    pub temperature_c: Option<f32>,
    pub pulse_bpm: Option<u16>,
}

/// Demographic snapshot embedded at booking time, so the clinical record
/// stays meaningful even if the patient profile later changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientSnapshot {
    pub full_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrescriptionItem {
    pub medication: String,
    pub dosage: String,
    pub instructions: Option<String>,
}

/// Clinical payload, discriminated by record type so each variant's required
/// fields are statically known instead of living in one open JSON blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "record_type", rename_all = "snake_case")]
pub enum AppointmentDetails {
    MedicalCheckup {
        vitals: Option<Vitals>,
        diagnosis: Option<String>,
        prescriptions: Vec<PrescriptionItem>,
        patient_snapshot: Option<PatientSnapshot>,
    },
    LabVisit {
        requested_tests: Vec<String>,
        patient_snapshot: Option<PatientSnapshot>,
    },
    PrescriptionRefill {
        prescriptions: Vec<PrescriptionItem>,
        pharmacy_note: Option<String>,
    },
}

impl AppointmentDetails {
    pub fn record_type(&self) -> &'static str {
        match self {
            AppointmentDetails::MedicalCheckup { .. } => "medical_checkup",
            AppointmentDetails::LabVisit { .. } => "lab_visit",
            AppointmentDetails::PrescriptionRefill { .. } => "prescription_refill",
        }
    }

    pub fn prescriptions(&self) -> &[PrescriptionItem] {
        match self {
            AppointmentDetails::MedicalCheckup { prescriptions, .. }
            | AppointmentDetails::PrescriptionRefill { prescriptions, .. } => prescriptions,
            AppointmentDetails::LabVisit { .. } => &[],
        }
    }

    pub fn empty_checkup() -> Self {
        AppointmentDetails::MedicalCheckup {
            vitals: None,
            diagnosis: None,
            prescriptions: Vec::new(),
            patient_snapshot: None,
        }
    }
}

/// A patient's booked encounter with a doctor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    /// Transiently nullable: unassigned appointments are a data-quality
    /// defect corrected by the remediation tooling
    pub doctor_id: Option<Uuid>,
    /// Clinic wall-clock time; schedules match on local date and time
    pub scheduled_at: NaiveDateTime,
    pub status: AppointmentStatus,
    pub reason: String,
    pub details: AppointmentDetails,
    pub fee: Decimal,
    pub reference_number: String,
    pub status_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn date(&self) -> NaiveDate {
        self.scheduled_at.date()
    }

    pub fn time(&self) -> NaiveTime {
        self.scheduled_at.time()
    }

    /// Cancelled appointments release their slot
    pub fn consumes_slot(&self) -> bool {
        self.status != AppointmentStatus::Cancelled
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub patient_id: Uuid,
    pub doctor_id: Option<Uuid>,
    pub scheduled_at: NaiveDateTime,
    pub reason: String,
    pub details: AppointmentDetails,
    pub fee: Decimal,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppointmentSearchQuery {
    pub patient_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
    pub from: Option<NaiveDateTime>,
    pub to: Option<NaiveDateTime>,
    pub limit: Option<usize>,
}

impl AppointmentSearchQuery {
    pub fn accepts(&self, appointment: &Appointment) -> bool {
        if let Some(patient_id) = self.patient_id {
            if appointment.patient_id != patient_id {
                return false;
            }
        }
        if let Some(doctor_id) = self.doctor_id {
            if appointment.doctor_id != Some(doctor_id) {
                return false;
            }
        }
        if let Some(status) = self.status {
            if appointment.status != status {
                return false;
            }
        }
        if let Some(from) = self.from {
            if appointment.scheduled_at < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if appointment.scheduled_at > to {
                return false;
            }
        }
        true
    }
}

/// The slot a booking competes for: one doctor, one date, one time window
#[derive(Debug, Clone, Copy)]
pub struct SlotWindow {
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingConfig {
    pub reference_prefix: String,
    pub retry_attempts: u32,
    pub retry_backoff_ms: u64,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            reference_prefix: "APT".to_string(),
            retry_attempts: 3,
            retry_backoff_ms: 50,
        }
    }
}

/// Human-readable reference number, e.g. `APT-20260907-3F9A2C`
pub fn reference_number(prefix: &str, scheduled_at: NaiveDateTime, id: Uuid) -> String {
    let short = id.simple().to_string();
    format!(
        "{}-{}-{}",
        prefix,
        scheduled_at.format("%Y%m%d"),
        short[..6].to_uppercase()
    )
}
