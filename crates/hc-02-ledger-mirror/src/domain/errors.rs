//! Error types for the ledger mirror subsystem.

use shared_types::BatchId;
use thiserror::Error;

/// Ledger mirror errors.
///
/// These never reach workflow callers: the recorder folds them into the
/// fact's `ledger_state`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerError {
    /// Ledger endpoint unreachable or not configured.
    #[error("Ledger unavailable: {0}")]
    Unavailable(String),

    /// An attempt exceeded its time bound.
    #[error("Ledger request timed out")]
    Timeout,

    /// The ledger refused the transaction.
    #[error("Ledger rejected transaction: {0}")]
    Rejected(String),

    /// Content-addressed store failure.
    #[error("Content store error: {0}")]
    ContentStore(String),

    /// The fact payload could not be serialized.
    #[error("Payload serialization failed: {0}")]
    Serialization(String),

    #[error("Batch not found: {0}")]
    BatchNotFound(BatchId),

    /// Reading or persisting fact receipts failed.
    #[error("Ledger state store error: {0}")]
    StateStore(String),
}

impl LedgerError {
    /// Whether another attempt may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Unavailable(_) | Self::Timeout | Self::ContentStore(_)
        )
    }

    /// Whether the failed submit may still have been written.
    pub fn may_have_landed(&self) -> bool {
        matches!(self, Self::Timeout)
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type for ledger mirror operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
