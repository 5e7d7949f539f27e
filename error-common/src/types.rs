use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

/// Domain error taxonomy shared by every ClinicFlow Engine crate.
#[derive(Error, Debug)]
pub enum ClinicError {
    /// Malformed input with field-level detail
    #[error("validation failed on `{field}`: {message}")]
    Validation { field: String, message: String },

    /// Referenced entity does not exist
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// Appointment status change violates the state machine
    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    /// Operation attempted against a terminal or otherwise wrong state
    #[error("{entity} is {current}; cannot {attempted}")]
    InvalidState {
        entity: &'static str,
        current: String,
        attempted: String,
    },

    /// Booking attempted against a full or unavailable schedule
    #[error("no bookable capacity for doctor {doctor_id} on {date}")]
    CapacityExceeded { doctor_id: Uuid, date: NaiveDate },

    /// The acting role may not perform this operation
    #[error("role `{role}` may not {action}")]
    AccessDenied { role: String, action: String },

    /// Transaction-level conflict (serialization failure, lost CAS).
    /// The only class that should be retried automatically.
    #[error("concurrency conflict: {0}")]
    ConcurrencyConflict(String),

    /// Unclassified persistence failure
    #[error("database error: {0}")]
    Database(String),

    /// Downstream collaborator failure
    #[error("external service error: {0}")]
    External(String),
}

impl ClinicError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Whether an automatic bounded retry is appropriate for this error
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict(_))
    }
}

/// Result type alias for ClinicFlow operations
pub type Result<T> = std::result::Result<T, ClinicError>;
