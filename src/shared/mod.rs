//! Shared Module
//!
//! Cross-cutting types used by every other module: the crate error type,
//! configuration, the caller identity and the logging bootstrap.

/// Crate error types
pub mod error;

/// Sync configuration
pub mod config;

/// Caller identity
pub mod identity;

/// Tracing subscriber bootstrap
#[cfg(feature = "cli")]
pub mod telemetry;

pub use error::{Result, SyncError};
pub use config::{SyncConfig, SyncConfigBuilder, ConfigError};
pub use identity::Identity;

/// Current wall-clock time in milliseconds since the Unix epoch
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
