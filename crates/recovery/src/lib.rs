//! Declined-payment retry scheduling and recovery notifications.
//!
//! Owns the lifecycle of failed charges from first failure through
//! resolution, exhaustion or an administrator stop: decline records, the
//! fixed backoff schedule, the idempotent `process_due_retries` sweep and
//! the at-most-once-per-attempt recovery emails.

pub mod core;
pub mod notifications;
pub mod settings;
pub mod state;
pub mod types;

pub use self::{core::*, settings::RecoverySettings, state::RecoveryState};
