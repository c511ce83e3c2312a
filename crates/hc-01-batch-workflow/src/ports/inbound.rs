//! # Inbound Ports
//!
//! What the Batch Workflow subsystem can do for role actors and for the
//! ledger mirror.

use crate::domain::{CompletionReport, WorkflowResult};
use async_trait::async_trait;
use shared_types::{Actor, Batch, BatchDraft, BatchId, BatchStatus, FactReceipt, FactType};

/// Batch workflow API - inbound port.
///
/// Every call carries the `(actor_id, role)` supplied by the auth layer.
#[async_trait]
pub trait BatchWorkflowApi: Send + Sync {
    /// Register a batch (collectors only) and enqueue its collection fact.
    async fn create_batch(&self, actor: &Actor, draft: BatchDraft) -> WorkflowResult<Batch>;

    /// Move a batch to `target` under a rule that needs no result payload.
    async fn request_transition(
        &self,
        batch_id: &BatchId,
        actor: &Actor,
        target: BatchStatus,
    ) -> WorkflowResult<Batch>;

    /// Atomically take the role's assignment slot and advance.
    async fn claim(&self, batch_id: &BatchId, actor: &Actor) -> WorkflowResult<Batch>;

    /// File the assigned actor's report and advance.
    async fn complete(
        &self,
        batch_id: &BatchId,
        actor: &Actor,
        report: CompletionReport,
    ) -> WorkflowResult<Batch>;

    /// Reject with a reason.
    async fn reject(&self, batch_id: &BatchId, actor: &Actor, reason: &str)
        -> WorkflowResult<Batch>;

    /// Current authoritative record.
    fn lookup(&self, batch_id: &BatchId) -> WorkflowResult<Batch>;

    /// Claimable work for the actor's role plus everything the actor owns.
    fn list_claimable(&self, actor: &Actor) -> WorkflowResult<Vec<Batch>>;
}

/// Ledger state API - inbound port used by the ledger mirror to read and
/// persist per-fact outcomes.
#[async_trait]
pub trait LedgerStateApi: Send + Sync {
    /// The fact's receipt, `None` if the fact was never enqueued.
    fn fact_receipt(
        &self,
        batch_id: &BatchId,
        fact_type: FactType,
    ) -> WorkflowResult<Option<FactReceipt>>;

    /// All receipts in enqueue order.
    fn fact_receipts(&self, batch_id: &BatchId) -> WorkflowResult<Vec<FactReceipt>>;

    /// Persist an outcome. A confirmed collection fact moves a still-pending
    /// batch to `recorded`.
    async fn apply_ledger_outcome(
        &self,
        batch_id: &BatchId,
        receipt: FactReceipt,
    ) -> WorkflowResult<Batch>;
}
