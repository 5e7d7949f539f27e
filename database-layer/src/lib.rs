//! Database connection and transaction management for ClinicFlow Engine
//!
//! Wraps `sqlx`/PostgreSQL behind a pool type shared by the Postgres-backed
//! repositories, and provides the transaction manager used on the
//! slot-booking path, where the capacity check and the insert must commit
//! under serializable isolation. Serialization failures (SQLSTATE 40001 /
//! 40P01) are classified so the caller's retry policy can distinguish a
//! transient conflict from a real persistence failure.

pub mod connection;
pub mod error;
pub mod transaction;

pub use connection::*;
pub use error::*;
pub use transaction::*;
