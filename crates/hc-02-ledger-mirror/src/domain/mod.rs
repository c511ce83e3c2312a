//! # Domain Module
//!
//! Retry policy, ledger records and the verification comparison.

pub mod entities;
pub mod errors;
pub mod retry;
pub mod verification;

pub use entities::{LedgerFact, LedgerReceipt, RecordOutcome};
pub use errors::{LedgerError, LedgerResult};
pub use retry::RetryPolicy;
pub use verification::{reconcile, VerificationResult, VerificationStatus};
