//! Error types for slotbook
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

use crate::client::ClientError;

/// All error types that can occur outside the booking pipeline itself
#[derive(Debug, Error)]
pub enum SlotbookError {
    /// Malformed or missing configuration
    #[error("Config error: {0}")]
    Config(String),

    /// A value violated a domain invariant
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Venue API error surfaced outside an attempt (e.g. credential checks)
    #[error("Client error: {0}")]
    Client(#[from] ClientError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for slotbook operations
pub type Result<T> = std::result::Result<T, SlotbookError>;
