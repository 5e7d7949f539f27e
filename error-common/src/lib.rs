//! Common error handling utilities for ClinicFlow Engine
//!
//! This module provides the shared domain error taxonomy, error codes, and
//! utilities used across all ClinicFlow Engine crates. It ensures consistent
//! error handling, proper error context preservation, and a single place
//! where retry semantics are defined.
//!
//! # Error Categories
//!
//! - **Validation**: malformed input with field-level detail; never retried
//! - **NotFound**: a referenced entity does not exist; not retried
//! - **InvalidTransition / InvalidState**: a state change violates the
//!   appointment or record-request state machine; surfaced with the current
//!   and attempted state; not retried
//! - **CapacityExceeded**: booking attempted against a full or unavailable
//!   schedule; the caller may retry against a different slot
//! - **AccessDenied**: the acting role may not perform the operation
//! - **ConcurrencyConflict**: a transaction-level conflict (serialization
//!   failure, lost compare-and-set). The one retryable class — see
//!   [`recovery::RetryPolicy`]
//! - **Database / External**: unclassified persistence or collaborator
//!   failures, fatal to the request and logged

pub mod codes;
pub mod context;
pub mod recovery;
pub mod types;

pub use codes::*;
pub use context::*;
pub use recovery::*;
pub use types::*;
