//! Error types for the audit crate.

use thiserror::Error;

/// Errors raised by security event sinks.
#[derive(Debug, Error)]
pub enum AuditError {
    /// The sink could not be built from configuration.
    #[error("failed to initialize security sink: {0}")]
    InitializationFailed(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A sink's internal state was poisoned by a panicking writer.
    #[error("storage error: {0}")]
    Storage(String),
}
