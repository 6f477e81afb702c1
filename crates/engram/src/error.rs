//! Error types for the engram engine

use thiserror::Error;

/// Main error type for engram operations
#[derive(Error, Debug)]
pub enum EngramError {
    /// A key or memory id is absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// An external consent/authorization collaborator refused the operation
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Durable read/write failures against the record store
    #[error("Storage error: {0}")]
    Storage(String),

    /// Malformed memory payload or missing required field
    #[error("Validation error: {0}")]
    Validation(String),

    /// Sweep re-entrancy detected and skipped
    #[error("Concurrency conflict: {0}")]
    Concurrency(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for engram operations
pub type Result<T> = std::result::Result<T, EngramError>;
