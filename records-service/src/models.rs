use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordType {
    MedicalRecord,
    LabRecord,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::MedicalRecord => "medical_record",
            RecordType::LabRecord => "lab_record",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "medical_record" => Some(RecordType::MedicalRecord),
            "lab_record" => Some(RecordType::LabRecord),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Approved,
    Denied,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Denied => "denied",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(RequestStatus::Pending),
            "approved" => Some(RequestStatus::Approved),
            "denied" => Some(RequestStatus::Denied),
            _ => None,
        }
    }

    /// Approved and denied are both terminal.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RequestStatus::Pending)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A patient's request for time-limited access to a record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordRequest {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub record_type: RecordType,
    pub record_id: Uuid,
    pub reason: String,
    pub status: RequestStatus,
    pub reviewed_by: Option<Uuid>,
    pub decided_at: Option<DateTime<Utc>>,
    pub denial_reason: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl RecordRequest {
    /// There is no stored "expired" state; validity is a function of the
    /// request and the supplied clock, nothing else.
    pub fn is_access_currently_valid(&self, now: DateTime<Utc>) -> bool {
        self.status == RequestStatus::Approved
            && self.expires_at.map_or(true, |expires| now <= expires)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitRecordRequest {
    pub patient_id: Uuid,
    pub record_type: RecordType,
    pub record_id: Uuid,
    pub reason: String,
}

/// The terminal half of a request, applied atomically against `Pending`.
#[derive(Debug, Clone)]
pub struct RequestDecision {
    pub status: RequestStatus,
    pub reviewed_by: Uuid,
    pub decided_at: DateTime<Utc>,
    pub denial_reason: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl RequestDecision {
    pub fn approval(reviewer: Uuid, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            status: RequestStatus::Approved,
            reviewed_by: reviewer,
            decided_at: Utc::now(),
            denial_reason: None,
            expires_at,
        }
    }

    pub fn denial(reviewer: Uuid, reason: String) -> Self {
        Self {
            status: RequestStatus::Denied,
            reviewed_by: reviewer,
            decided_at: Utc::now(),
            denial_reason: Some(reason),
            expires_at: None,
        }
    }
}

/// A lab result; the attachment itself lives in the file store, only the
/// opaque key is kept here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabResult {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub test_name: String,
    pub result_summary: String,
    pub attachment_key: Option<String>,
    pub recorded_by: Uuid,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewLabResult {
    pub patient_id: Uuid,
    pub test_name: String,
    pub result_summary: String,
    pub attachment: Option<Vec<u8>>,
}
