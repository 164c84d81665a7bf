//!
//! Logger of the application.
//!

pub mod config;
pub mod setup;

pub use config::{Config, Level, Log, LogConsole, LogFile, LogFormat};
pub use setup::{setup, TelemetryGuard};
pub use tracing::{debug, error, info, warn};
