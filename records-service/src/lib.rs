//! Record-access requests and lab results for ClinicFlow Engine
//!
//! Patients request time-limited access to a medical or lab record; clinical
//! staff approve (optionally with an expiry) or deny with a reason. Both
//! decisions are terminal. Access validity is never stored: it is recomputed
//! from the request's status and expiry at every check.
//!
//! Lab results carry only an opaque attachment key; the bytes live behind
//! the [`FileStore`] seam.

pub mod models;
pub mod repository;
pub mod service;
pub mod storage;

pub use models::*;
pub use repository::*;
pub use service::*;
pub use storage::*;
