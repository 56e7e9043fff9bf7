//! Unified error types for the crivet workspace.
//!
//! The runtime abstraction reports failures with [`CrivetError`]. The e2e
//! harness defines its own verification error that wraps these variants
//! together with the operation and identifier that produced them.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum CrivetError {
    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// A required resource was not found.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Type of the missing resource.
        kind: &'static str,
        /// Identifier of the missing resource.
        id: String,
    },

    /// The requested operation is not valid in the resource's current state.
    #[error("invalid state for {id}: {message}")]
    InvalidState {
        /// Identifier of the resource.
        id: String,
        /// Description of the rejected operation.
        message: String,
    },

    /// A log line did not have the expected record shape.
    #[error("malformed log record: {message}")]
    Decode {
        /// Description of the structural problem.
        message: String,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, CrivetError>;
