// Standardized error codes surfaced on API responses

use crate::types::ClinicError;

pub mod validation {
    pub const INVALID_INPUT: &str = "VALIDATION_1001";
    pub const MISSING_REQUIRED_FIELD: &str = "VALIDATION_1002";
}

pub mod authorization {
    pub const ACCESS_DENIED: &str = "AUTHZ_2001";
}

pub mod scheduling {
    pub const NOT_FOUND: &str = "SCHED_3001";
    pub const INVALID_TRANSITION: &str = "SCHED_3002";
    pub const INVALID_STATE: &str = "SCHED_3003";
    pub const CAPACITY_EXCEEDED: &str = "SCHED_3004";
}

pub mod persistence {
    pub const CONCURRENCY_CONFLICT: &str = "DB_4001";
    pub const QUERY_FAILED: &str = "DB_4002";
    pub const EXTERNAL_FAILURE: &str = "DB_4003";
}

/// Map a domain error to its stable error code
pub fn code_for(error: &ClinicError) -> &'static str {
    match error {
        ClinicError::Validation { .. } => validation::INVALID_INPUT,
        ClinicError::AccessDenied { .. } => authorization::ACCESS_DENIED,
        ClinicError::NotFound { .. } => scheduling::NOT_FOUND,
        ClinicError::InvalidTransition { .. } => scheduling::INVALID_TRANSITION,
        ClinicError::InvalidState { .. } => scheduling::INVALID_STATE,
        ClinicError::CapacityExceeded { .. } => scheduling::CAPACITY_EXCEEDED,
        ClinicError::ConcurrencyConflict(_) => persistence::CONCURRENCY_CONFLICT,
        ClinicError::Database(_) => persistence::QUERY_FAILED,
        ClinicError::External(_) => persistence::EXTERNAL_FAILURE,
    }
}
