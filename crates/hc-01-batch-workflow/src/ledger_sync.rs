//! # Ledger Sync
//!
//! Applies ledger mirror outcomes back onto batches. This is the only place
//! `ledger_state` and fact receipts change after enqueue, and the only path
//! for the internal `pending -> recorded` confirmation.

use crate::domain::{invariants, state_machine, Action, Evidence, WorkflowError, WorkflowResult};
use crate::notify;
use crate::ports::inbound::LedgerStateApi;
use crate::ports::outbound::{BatchRepository, TimeSource};
use async_trait::async_trait;
use shared_bus::{BatchEvent, EventPublisher};
use shared_types::{Actor, Batch, BatchId, BatchStatus, FactReceipt, FactType, MirrorStatus};
use std::sync::Arc;
use tracing::{debug, info};

/// Writes ledger outcomes through the same conditional update as the
/// workflow service.
pub struct LedgerSync<R, T>
where
    R: BatchRepository,
    T: TimeSource,
{
    repository: Arc<R>,
    time: Arc<T>,
    publisher: Arc<dyn EventPublisher>,
}

impl<R, T> LedgerSync<R, T>
where
    R: BatchRepository,
    T: TimeSource,
{
    pub fn new(repository: Arc<R>, time: Arc<T>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            repository,
            time,
            publisher,
        }
    }

    fn load(&self, batch_id: &BatchId) -> WorkflowResult<Batch> {
        self.repository
            .get(batch_id)?
            .ok_or_else(|| WorkflowError::NotFound(batch_id.clone()))
    }
}

/// A confirmed receipt never goes back to pending or failed.
fn check_receipt(batch: &Batch, receipt: &FactReceipt) -> WorkflowResult<()> {
    let current = batch.fact(receipt.fact_type).ok_or_else(|| {
        WorkflowError::Validation(format!(
            "{} fact was never enqueued for {}",
            receipt.fact_type, batch.batch_id
        ))
    })?;

    if current.status == MirrorStatus::Confirmed && receipt.status != MirrorStatus::Confirmed {
        return Err(WorkflowError::Conflict {
            batch_id: batch.batch_id.clone(),
            reason: format!("{} fact is already confirmed", receipt.fact_type),
        });
    }

    if receipt.status == MirrorStatus::Confirmed && !receipt.state.recorded {
        return Err(WorkflowError::Validation(format!(
            "confirmed {} receipt carries no transaction",
            receipt.fact_type
        )));
    }
    Ok(())
}

#[async_trait]
impl<R, T> LedgerStateApi for LedgerSync<R, T>
where
    R: BatchRepository + 'static,
    T: TimeSource + 'static,
{
    fn fact_receipt(
        &self,
        batch_id: &BatchId,
        fact_type: FactType,
    ) -> WorkflowResult<Option<FactReceipt>> {
        Ok(self.load(batch_id)?.fact(fact_type).cloned())
    }

    fn fact_receipts(&self, batch_id: &BatchId) -> WorkflowResult<Vec<FactReceipt>> {
        Ok(self.load(batch_id)?.ledger_facts)
    }

    async fn apply_ledger_outcome(
        &self,
        batch_id: &BatchId,
        receipt: FactReceipt,
    ) -> WorkflowResult<Batch> {
        let now = self.time.now();
        let system = Actor::system();
        let mut advanced: Option<BatchStatus> = None;

        let batch = self.repository.update(batch_id, &mut |batch: &mut Batch| {
            advanced = None;
            check_receipt(batch, &receipt)?;
            let before = batch.clone();
            batch.apply_fact_state(receipt.fact_type, receipt.status, receipt.state.clone());

            let confirms_collection = receipt.fact_type == FactType::Collection
                && receipt.status == MirrorStatus::Confirmed;
            if confirms_collection && batch.status == BatchStatus::Pending {
                let rule = state_machine::authorize(
                    batch,
                    &system,
                    BatchStatus::Recorded,
                    Some(Action::Confirm),
                    Evidence::None,
                )?;
                advanced = Some(state_machine::apply(batch, rule, &system, now));
            }

            invariants::check_commit(&before, batch)
        })?;

        debug!(
            batch_id = %batch_id,
            fact = %receipt.fact_type,
            status = ?receipt.status,
            attempts = receipt.state.attempts,
            "[hc-01] Ledger outcome applied"
        );

        if let Some(from) = advanced {
            info!(
                batch_id = %batch_id,
                tx = ?batch.ledger_state.transaction_ref,
                "[hc-01] Collection confirmed on ledger"
            );
            notify::publish(
                self.publisher.as_ref(),
                BatchEvent::StatusChanged {
                    batch_id: batch_id.clone(),
                    from,
                    to: batch.status,
                    role: system.role,
                    actor_id: system.id.clone(),
                },
            )
            .await;
        }

        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryBatchRepository;
    use crate::domain::pool;
    use crate::ports::outbound::MockTimeSource;
    use shared_bus::{EventFilter, InMemoryEventBus};
    use shared_types::{ActorId, BatchAttributes, LedgerState};

    struct Harness {
        sync: LedgerSync<InMemoryBatchRepository, MockTimeSource>,
        repository: Arc<InMemoryBatchRepository>,
        bus: Arc<InMemoryEventBus>,
    }

    fn harness() -> Harness {
        let repository = Arc::new(InMemoryBatchRepository::new());
        let bus = Arc::new(InMemoryEventBus::connected(64));
        let mut batch = Batch::new(
            BatchId::new("ASH-2024-001"),
            BatchAttributes {
                herb_species: "Ashwagandha".to_string(),
                quantity: 40.0,
                location: "Rajasthan".to_string(),
                quality_grade: "B".to_string(),
                harvest_method: "hand-picked".to_string(),
                organic_certified: false,
            },
            ActorId::new("farmer-1"),
            1_000,
        );
        batch.enqueue_fact(FactType::Collection);
        repository.insert(batch).unwrap();

        Harness {
            sync: LedgerSync::new(
                repository.clone(),
                Arc::new(MockTimeSource::new(2_000)),
                bus.clone(),
            ),
            repository,
            bus,
        }
    }

    fn id() -> BatchId {
        BatchId::new("ASH-2024-001")
    }

    fn confirmed(fact_type: FactType) -> FactReceipt {
        FactReceipt {
            fact_type,
            status: MirrorStatus::Confirmed,
            state: LedgerState::default().confirmed("tx-1", 7, "hash-a"),
        }
    }

    #[tokio::test]
    async fn test_confirmed_collection_records_pending_batch() {
        let h = harness();
        let mut sub = h.bus.subscribe(EventFilter::all());

        let batch = h
            .sync
            .apply_ledger_outcome(&id(), confirmed(FactType::Collection))
            .await
            .unwrap();

        assert_eq!(batch.status, BatchStatus::Recorded);
        assert!(batch.ledger_state.recorded);
        assert_eq!(batch.ledger_state.transaction_ref.as_deref(), Some("tx-1"));
        assert_eq!(sub.try_recv().unwrap().unwrap().name(), "batch.status_changed");
    }

    #[tokio::test]
    async fn test_confirmation_after_claim_does_not_move_status() {
        let h = harness();
        h.repository
            .update(&id(), &mut |batch: &mut Batch| {
                pool::claim(batch, &Actor::processor("proc-a"), 1_500).map(|_| ())
            })
            .unwrap();

        let batch = h
            .sync
            .apply_ledger_outcome(&id(), confirmed(FactType::Collection))
            .await
            .unwrap();
        assert_eq!(batch.status, BatchStatus::Processing);
        assert!(batch.fact(FactType::Collection).unwrap().state.recorded);
    }

    #[tokio::test]
    async fn test_failed_attempts_accumulate() {
        let h = harness();
        let mut state = LedgerState::default();
        for attempt in 1..=3 {
            state = state.with_failed_attempt(format!("timeout #{attempt}"));
            h.sync
                .apply_ledger_outcome(
                    &id(),
                    FactReceipt {
                        fact_type: FactType::Collection,
                        status: MirrorStatus::Pending,
                        state: state.clone(),
                    },
                )
                .await
                .unwrap();
        }

        let receipt = h.sync.fact_receipt(&id(), FactType::Collection).unwrap().unwrap();
        assert_eq!(receipt.state.attempts, 3);
        assert!(!receipt.state.recorded);
        assert_eq!(h.sync.fact_receipts(&id()).unwrap().len(), 1);
        assert_eq!(h.repository.get(&id()).unwrap().unwrap().status, BatchStatus::Pending);
    }

    #[tokio::test]
    async fn test_confirmed_receipt_cannot_be_downgraded() {
        let h = harness();
        h.sync
            .apply_ledger_outcome(&id(), confirmed(FactType::Collection))
            .await
            .unwrap();
        let err = h
            .sync
            .apply_ledger_outcome(
                &id(),
                FactReceipt {
                    fact_type: FactType::Collection,
                    status: MirrorStatus::Failed,
                    state: LedgerState::default().with_failed_attempt("late failure"),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_unknown_fact_is_rejected() {
        let h = harness();
        let err = h
            .sync
            .apply_ledger_outcome(&id(), confirmed(FactType::Completion))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));
        assert_eq!(h.sync.fact_receipt(&id(), FactType::Completion).unwrap(), None);
    }

    #[tokio::test]
    async fn test_unknown_batch() {
        let h = harness();
        let err = h
            .sync
            .fact_receipts(&BatchId::new("ASH-2024-404"))
            .unwrap_err();
        assert!(matches!(err, WorkflowError::NotFound(_)));
    }
}
