//! Doctor schedule management for ClinicFlow Engine
//!
//! A doctor declares availability windows — recurring weekly or for one
//! specific date — each with a wall-clock time window, an appointment
//! capacity, and an approval lifecycle (created `Pending`, approved by
//! clinical staff). The availability calculator derives the currently
//! bookable slot count for a schedule on a given date by subtracting booked
//! appointments (supplied through the [`BookedSlotSource`] seam) from the
//! schedule's capacity.
//!
//! The recurrence is an explicit sum type — a schedule is either weekly or
//! one-off, never ambiguously both.

pub mod availability;
pub mod models;
pub mod repository;
pub mod service;

pub use availability::*;
pub use models::*;
pub use repository::*;
pub use service::*;
