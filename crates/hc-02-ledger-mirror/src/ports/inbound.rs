//! # Inbound Ports
//!
//! What the Ledger Mirror subsystem offers the node.

use crate::domain::{LedgerResult, RecordOutcome, VerificationResult};
use async_trait::async_trait;
use shared_types::{BatchId, FactType};

/// Fact recording API - inbound port.
#[async_trait]
pub trait FactRecorderApi: Send + Sync {
    /// Run (or short-circuit) the fact's attempt chain.
    ///
    /// Errors only when the receipt could not be read or persisted; ledger
    /// failures are reported as `RecordOutcome::Failed`.
    async fn record(
        &self,
        batch_id: &BatchId,
        fact_type: FactType,
        payload: &serde_json::Value,
    ) -> LedgerResult<RecordOutcome>;
}

/// Verification API - inbound port.
#[async_trait]
pub trait VerificationApi: Send + Sync {
    /// Compare the local record with the ledger. Never corrects either side.
    async fn verify(&self, batch_id: &BatchId) -> LedgerResult<VerificationResult>;
}
