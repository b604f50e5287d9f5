//! Sync Error Types
//!
//! This module defines the error taxonomy of the sync core.
//!
//! # Error Categories
//!
//! - `StorageCorrupt` - a persisted blob failed to parse
//! - `Storage` - the durable key-value store could not be read or written
//! - `RemoteUnavailable` - network/backend failure during fetch or write
//! - `RemoteRejected` - the remote store refused a write
//! - `UploadInProgress` - a second upload was requested while one is in flight
//! - `Forbidden` - the caller identity is not privileged
//! - `Validation` - a payload or import document failed validation
//!
//! Remote failures never change local state: dirty records stay dirty and a
//! retry is always safe.
//!
//! # Usage
//!
//! ```rust
//! use curriculum_sync::SyncError;
//!
//! let error = SyncError::remote_unavailable("connection refused");
//! assert!(error.is_retryable());
//! ```
use thiserror::Error;

use crate::shared::config::ConfigError;

/// Result type for sync core operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Errors raised by the sync core
#[derive(Debug, Error)]
pub enum SyncError {
    /// A persisted blob failed to parse
    #[error("Storage corrupt at '{key}': {message}")]
    StorageCorrupt {
        /// Storage key holding the corrupt blob
        key: String,
        /// Parser message
        message: String,
    },

    /// The durable store failed to read or write
    #[error("Storage error: {message}")]
    Storage {
        /// Human-readable error message
        message: String,
    },

    /// Network or backend failure
    #[error("Remote unavailable: {message}")]
    RemoteUnavailable {
        /// Human-readable error message
        message: String,
    },

    /// The remote store refused the request (permission, validation)
    #[error("Remote rejected the request{}: {message}", .status.map(|s| format!(" ({s})")).unwrap_or_default())]
    RemoteRejected {
        /// HTTP status, when the transport has one
        status: Option<u16>,
        /// Message returned by the remote store
        message: String,
    },

    /// An upload is already in flight
    #[error("An upload is already in progress")]
    UploadInProgress,

    /// The caller is not allowed to run sync operations
    #[error("User '{user_id}' is not allowed to modify curriculum content")]
    Forbidden {
        /// Identity that was refused
        user_id: String,
    },

    /// Payload or import validation failure
    #[error("Validation error in field '{field}': {message}")]
    Validation {
        /// The field that failed validation
        field: String,
        /// Human-readable error message
        message: String,
    },

    /// JSON serialization or deserialization failure
    #[error("Serialization error: {message}")]
    Serialization {
        /// Human-readable error message
        message: String,
    },

    /// Invalid configuration
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl SyncError {
    /// Create a new storage corruption error
    pub fn storage_corrupt(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StorageCorrupt {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create a new storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Create a new remote-unavailable error
    pub fn remote_unavailable(message: impl Into<String>) -> Self {
        Self::RemoteUnavailable {
            message: message.into(),
        }
    }

    /// Create a new remote-rejected error
    pub fn remote_rejected(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::RemoteRejected {
            status,
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Whether the same call may succeed if retried unchanged
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RemoteUnavailable { .. } | Self::UploadInProgress)
    }

    /// Whether the error came from the remote store
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::RemoteUnavailable { .. } | Self::RemoteRejected { .. })
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(format!("JSON error: {}", err))
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        Self::storage(err.to_string())
    }
}
