//! Outbound (Driven) ports for the Ledger Mirror subsystem.
//!
//! The external ledger and object store are consumed only through these
//! narrow contracts. Per-fact outcomes are persisted through
//! `LedgerStateStore`, which the node binds to the batch workflow.

use crate::domain::{LedgerFact, LedgerReceipt, LedgerResult};
use async_trait::async_trait;
use shared_types::{BatchId, FactReceipt, FactType};

/// External distributed ledger.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Submit a recording transaction and wait until it is mined.
    ///
    /// May fail transiently (`Unavailable`, `Timeout`). A `Timeout` does not
    /// mean the transaction was dropped.
    async fn submit(
        &self,
        batch_id: &BatchId,
        fact_type: FactType,
        object_hash: &str,
    ) -> LedgerResult<LedgerReceipt>;

    /// Every fact the ledger holds for a batch.
    async fn query(&self, batch_id: &BatchId) -> LedgerResult<Vec<LedgerFact>>;
}

/// Content-addressed object store.
#[async_trait]
pub trait ContentAddressStore: Send + Sync {
    /// Store bytes, returning their content hash. Idempotent.
    async fn put(&self, bytes: Vec<u8>) -> LedgerResult<String>;

    async fn get(&self, hash: &str) -> LedgerResult<Option<Vec<u8>>>;
}

/// Where fact receipts live.
#[async_trait]
pub trait LedgerStateStore: Send + Sync {
    /// The fact's receipt, `None` if it was never enqueued.
    /// Unknown batches fail with `BatchNotFound`.
    async fn load(&self, batch_id: &BatchId, fact_type: FactType)
        -> LedgerResult<Option<FactReceipt>>;

    /// Persist a receipt for an enqueued fact.
    async fn store(&self, batch_id: &BatchId, receipt: FactReceipt) -> LedgerResult<()>;

    /// All receipts for a batch, in enqueue order.
    async fn facts(&self, batch_id: &BatchId) -> LedgerResult<Vec<FactReceipt>>;
}
