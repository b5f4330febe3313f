//! Error types for the compiler crate.

use restgate_core::{IdentError, PayloadError};
use thiserror::Error;

use crate::request::Method;

/// Errors raised while compiling a request. None of them reach the database.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// An identifier could not be used in SQL text.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// The target table name failed the identifier pattern.
    #[error("invalid table name")]
    InvalidTable,

    /// No columns remain to write.
    #[error("request body has no writable columns")]
    EmptyPayload,

    /// An update or delete without any filter.
    #[error("{method} requires at least one filter")]
    MissingFilter { method: Method },

    /// The body is not an object (or array of objects) with valid keys.
    #[error("invalid payload: {0}")]
    InvalidPayload(#[from] PayloadError),

    /// Rows of an insert batch do not share one column set.
    #[error("all rows of a batch insert must have the same columns")]
    NonUniformBatch,
}

impl CompileError {
    /// Stable machine-readable code for error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidIdentifier(_) => "invalid_identifier",
            Self::InvalidTable => "invalid_table",
            Self::EmptyPayload => "empty_payload",
            Self::MissingFilter { .. } => "missing_filter",
            Self::InvalidPayload(_) => "invalid_payload",
            Self::NonUniformBatch => "non_uniform_batch",
        }
    }
}

impl From<IdentError> for CompileError {
    fn from(err: IdentError) -> Self {
        Self::InvalidIdentifier(err.to_string())
    }
}
