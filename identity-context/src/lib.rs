//! Authenticated actor context for ClinicFlow Engine
//!
//! Every core operation receives an [`ActorContext`] explicitly instead of
//! reaching into ambient authentication state. The context carries who is
//! acting and in which role; [`ActorContext::authorize`] gates the operation
//! and [`ActorContext::require_self_or_staff`] enforces that patients only
//! act on their own records.
//!
//! Authentication itself (sessions, tokens) happens at the boundary and is
//! out of scope here: by the time an `ActorContext` exists, the actor is
//! authenticated.

pub mod models;
pub mod permissions;

pub use models::*;
pub use permissions::*;
