//! # Metered Workflow
//!
//! Wraps a `BatchWorkflowApi` and counts lost claim races. Everything else
//! worth counting is visible on the bus; a rejected claim is not.

use async_trait::async_trait;
use hc_01_batch_workflow::{BatchWorkflowApi, CompletionReport, WorkflowError, WorkflowResult};
use herb_telemetry::CLAIM_CONFLICTS;
use shared_types::{Actor, Batch, BatchDraft, BatchId, BatchStatus};
use std::sync::Arc;

pub struct MeteredWorkflow {
    inner: Arc<dyn BatchWorkflowApi>,
}

impl MeteredWorkflow {
    pub fn new(inner: Arc<dyn BatchWorkflowApi>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl BatchWorkflowApi for MeteredWorkflow {
    async fn create_batch(&self, actor: &Actor, draft: BatchDraft) -> WorkflowResult<Batch> {
        self.inner.create_batch(actor, draft).await
    }

    async fn request_transition(
        &self,
        batch_id: &BatchId,
        actor: &Actor,
        target: BatchStatus,
    ) -> WorkflowResult<Batch> {
        self.inner.request_transition(batch_id, actor, target).await
    }

    async fn claim(&self, batch_id: &BatchId, actor: &Actor) -> WorkflowResult<Batch> {
        let result = self.inner.claim(batch_id, actor).await;
        if let Err(WorkflowError::Conflict { .. }) = &result {
            CLAIM_CONFLICTS.inc();
        }
        result
    }

    async fn complete(
        &self,
        batch_id: &BatchId,
        actor: &Actor,
        report: CompletionReport,
    ) -> WorkflowResult<Batch> {
        self.inner.complete(batch_id, actor, report).await
    }

    async fn reject(
        &self,
        batch_id: &BatchId,
        actor: &Actor,
        reason: &str,
    ) -> WorkflowResult<Batch> {
        self.inner.reject(batch_id, actor, reason).await
    }

    fn lookup(&self, batch_id: &BatchId) -> WorkflowResult<Batch> {
        self.inner.lookup(batch_id)
    }

    fn list_claimable(&self, actor: &Actor) -> WorkflowResult<Vec<Batch>> {
        self.inner.list_claimable(actor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every claim loses.
    struct Contended;

    #[async_trait]
    impl BatchWorkflowApi for Contended {
        async fn create_batch(&self, _: &Actor, _: BatchDraft) -> WorkflowResult<Batch> {
            Err(WorkflowError::Validation("unused".into()))
        }

        async fn request_transition(
            &self,
            _: &BatchId,
            _: &Actor,
            _: BatchStatus,
        ) -> WorkflowResult<Batch> {
            Err(WorkflowError::Validation("unused".into()))
        }

        async fn claim(&self, batch_id: &BatchId, _: &Actor) -> WorkflowResult<Batch> {
            Err(WorkflowError::Conflict {
                batch_id: batch_id.clone(),
                reason: "already claimed".into(),
            })
        }

        async fn complete(
            &self,
            _: &BatchId,
            _: &Actor,
            _: CompletionReport,
        ) -> WorkflowResult<Batch> {
            Err(WorkflowError::Validation("unused".into()))
        }

        async fn reject(&self, _: &BatchId, _: &Actor, _: &str) -> WorkflowResult<Batch> {
            Err(WorkflowError::Validation("unused".into()))
        }

        fn lookup(&self, batch_id: &BatchId) -> WorkflowResult<Batch> {
            Err(WorkflowError::NotFound(batch_id.clone()))
        }

        fn list_claimable(&self, _: &Actor) -> WorkflowResult<Vec<Batch>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_lost_claim_is_counted_and_passed_through() {
        let workflow = MeteredWorkflow::new(Arc::new(Contended));
        let before = CLAIM_CONFLICTS.get();

        let result = workflow
            .claim(&BatchId::new("ASH-2024-001"), &Actor::processor("proc-b"))
            .await;

        assert!(matches!(result, Err(WorkflowError::Conflict { .. })));
        assert!(CLAIM_CONFLICTS.get() >= before + 1.0);
    }
}
