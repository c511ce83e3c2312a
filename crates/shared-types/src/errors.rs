//! # Error Types
//!
//! Parse errors for the string forms of shared value types.

use thiserror::Error;

/// Errors raised when parsing a value type from its wire/string form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Role name not recognised.
    #[error("Unknown role: {0}")]
    UnknownRole(String),

    /// Batch status name not recognised.
    #[error("Unknown batch status: {0}")]
    UnknownStatus(String),

    /// Fact type name not recognised.
    #[error("Unknown fact type: {0}")]
    UnknownFactType(String),
}
