//! Appointment lifecycle management for ClinicFlow Engine
//!
//! Covers the full life of an appointment:
//!
//! - booking against a doctor's approved schedule, with the capacity check
//!   and the insert performed as one atomic step (two concurrent bookings
//!   can no longer both squeeze into the last slot)
//! - status transitions through the `pending → confirmed → completed`
//!   state machine, with cancellation from either active state and
//!   terminal states frozen
//! - remediation tooling for unassigned appointments (single and
//!   all-or-nothing bulk assignment)
//! - structured consultation snapshots for the external document renderer
//!
//! Status changes and bookings emit fire-and-forget notification events;
//! delivery failures never roll back the state change.

pub mod documents;
pub mod lifecycle;
pub mod models;
pub mod repository;
pub mod service;

pub use documents::*;
pub use lifecycle::*;
pub use models::*;
pub use repository::*;
pub use service::*;
