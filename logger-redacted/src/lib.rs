//! PHI-aware logging for ClinicFlow Engine
//!
//! Clinic log lines routinely carry free text written by patients and staff
//! (booking reasons, denial reasons, clinical notes). This crate provides the
//! `tracing` subscriber initialization used across the workspace plus a
//! [`PhiRedactor`] that scrubs protected health information from any free
//! text before it reaches a log sink.
//!
//! Redacted value classes:
//!
//! - email addresses
//! - phone numbers
//! - medical record numbers (`MRN123456`)
//! - PPSN-style national identifiers (`1234567AB`)
//!
//! Redacted values are replaced by a short stable hash so separate log lines
//! about the same patient can still be correlated without exposing the value.

pub mod config;
pub mod redactor;

pub use config::*;
pub use redactor::*;

use tracing_subscriber::EnvFilter;

/// Initialize the workspace-wide tracing subscriber.
///
/// `RUST_LOG` overrides the configured level when set. Safe to call once per
/// process; subsequent calls are ignored.
pub fn init_logging(config: &LoggerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
