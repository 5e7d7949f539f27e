//! Notification event publishing for ClinicFlow Engine
//!
//! The appointment and record-request services emit a [`NotificationEvent`]
//! whenever state changes in a way a user should hear about (appointment
//! status changed, record request decided). Delivery belongs to an external
//! notification subsystem; this crate only defines the event shape, the
//! [`NotificationPublisher`] seam, and two implementations:
//!
//! - [`InMemoryPublisher`] collects events for inspection in tests and
//!   development
//! - [`NatsPublisher`] forwards events to the delivery subsystem over NATS
//!
//! Publishing is fire-and-forget: a failed publish is logged and never rolls
//! back the state transition that produced it. Call sites go through
//! [`emit`], which swallows publisher errors after logging them.

pub mod error;
pub mod event;
pub mod nats;
pub mod publisher;

pub use error::*;
pub use event::*;
pub use nats::*;
pub use publisher::*;
