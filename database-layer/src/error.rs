use error_common::ClinicError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("database connection failed: {0}")]
    ConnectionFailed(String),

    #[error("query failed: {0}")]
    QueryFailed(String),

    #[error("transaction serialization failure: {0}")]
    Serialization(String),
}

pub type DatabaseResult<T> = std::result::Result<T, DatabaseError>;

/// SQLSTATE codes PostgreSQL raises when a serializable transaction loses
/// the race: serialization_failure and deadlock_detected.
const SERIALIZATION_SQLSTATES: [&str; 2] = ["40001", "40P01"];

pub fn is_serialization_failure(error: &sqlx::Error) -> bool {
    error
        .as_database_error()
        .and_then(|db| db.code())
        .map(|code| SERIALIZATION_SQLSTATES.contains(&code.as_ref()))
        .unwrap_or(false)
}

/// Classify an sqlx error so transient conflicts stay distinguishable.
pub fn classify(error: sqlx::Error) -> DatabaseError {
    if is_serialization_failure(&error) {
        DatabaseError::Serialization(error.to_string())
    } else {
        DatabaseError::QueryFailed(error.to_string())
    }
}

impl From<DatabaseError> for ClinicError {
    fn from(error: DatabaseError) -> Self {
        match error {
            DatabaseError::Serialization(message) => ClinicError::ConcurrencyConflict(message),
            DatabaseError::ConnectionFailed(message) | DatabaseError::QueryFailed(message) => {
                ClinicError::Database(message)
            }
        }
    }
}
