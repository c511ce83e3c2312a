//! Batch Workflow Service - Core business logic
//!
//! Every mutation runs as a conditional update against one batch: the
//! assignment pool validates and mutates a copy, invariants are checked,
//! and only then does the repository commit. Notifications and ledger facts
//! go out after the commit and can never undo it.

use crate::domain::pool::{self, Transition};
use crate::domain::{
    invariants, validate_attributes, BatchIdentity, CompletionReport, WorkflowConfig,
    WorkflowError, WorkflowResult,
};
use crate::notify;
use crate::ports::inbound::BatchWorkflowApi;
use crate::ports::outbound::{BatchRepository, FactRequest, LedgerMirror, TimeSource};
use async_trait::async_trait;
use serde_json::json;
use shared_bus::{BatchEvent, EventPublisher};
use shared_types::{
    Actor, Batch, BatchDraft, BatchId, BatchStatus, FactType, Role, Timestamp,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of one committed update.
struct Commit {
    batch: Batch,
    transition: Transition,
    /// Fact newly enqueued by this commit.
    fact: Option<FactType>,
}

/// Batch Workflow Service implementation.
pub struct BatchWorkflowService<R, T>
where
    R: BatchRepository,
    T: TimeSource,
{
    identity: BatchIdentity,
    repository: Arc<R>,
    time: Arc<T>,
    mirror: Arc<dyn LedgerMirror>,
    publisher: Arc<dyn EventPublisher>,
}

impl<R, T> BatchWorkflowService<R, T>
where
    R: BatchRepository,
    T: TimeSource,
{
    /// Create new workflow service.
    pub fn new(
        config: WorkflowConfig,
        repository: Arc<R>,
        time: Arc<T>,
        mirror: Arc<dyn LedgerMirror>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        let identity =
            BatchIdentity::new(config.id_max_attempts).with_suffix_len(config.id_suffix_len);
        Self {
            identity,
            repository,
            time,
            mirror,
            publisher,
        }
    }

    /// Replace the id generator (e.g. with a deterministic suffix source).
    pub fn with_identity(mut self, identity: BatchIdentity) -> Self {
        self.identity = identity;
        self
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }

    /// Run one conditional update and enqueue the rule's fact inside it.
    fn commit(
        &self,
        batch_id: &BatchId,
        mut mutate: impl FnMut(&mut Batch, Timestamp) -> WorkflowResult<Transition>,
    ) -> WorkflowResult<Commit> {
        let now = self.time.now();
        let mut outcome: Option<(Transition, Option<FactType>)> = None;

        let batch = self.repository.update(batch_id, &mut |batch: &mut Batch| {
            let before = batch.clone();
            let transition = mutate(batch, now)?;
            let fact = transition
                .rule
                .fact()
                .filter(|fact| batch.enqueue_fact(*fact));
            invariants::check_commit(&before, batch)?;
            outcome = Some((transition, fact));
            Ok(())
        })?;

        let (transition, fact) = outcome.ok_or_else(|| {
            WorkflowError::Storage(format!("update of {batch_id} committed without a transition"))
        })?;
        Ok(Commit {
            batch,
            transition,
            fact,
        })
    }

    /// Notify and hand the fact to the mirror. Never fails.
    async fn after_commit(&self, actor: &Actor, commit: &Commit) {
        let Commit {
            batch,
            transition,
            fact,
        } = commit;

        info!(
            batch_id = %batch.batch_id,
            from = %transition.from,
            to = %transition.to,
            actor = %actor,
            version = batch.version,
            "[hc-01] Transition committed"
        );

        if transition.rule.action == crate::domain::Action::Claim {
            notify::publish(
                self.publisher.as_ref(),
                BatchEvent::Claimed {
                    batch_id: batch.batch_id.clone(),
                    role: actor.role,
                    actor_id: actor.id.clone(),
                    status: transition.to,
                },
            )
            .await;
        }

        notify::publish(
            self.publisher.as_ref(),
            BatchEvent::StatusChanged {
                batch_id: batch.batch_id.clone(),
                from: transition.from,
                to: transition.to,
                role: actor.role,
                actor_id: actor.id.clone(),
            },
        )
        .await;

        if let Some(fact) = fact {
            self.dispatch_fact(batch, *fact, actor);
        }
    }

    fn dispatch_fact(&self, batch: &Batch, fact_type: FactType, actor: &Actor) {
        debug!(
            batch_id = %batch.batch_id,
            fact = %fact_type,
            "[hc-01] Handing fact to ledger mirror"
        );
        self.mirror.mirror(FactRequest {
            batch_id: batch.batch_id.clone(),
            fact_type,
            payload: fact_payload(batch, fact_type, actor),
        });
    }

    fn new_batch(&self, batch_id: BatchId, actor: &Actor, draft: &BatchDraft, now: Timestamp) -> Batch {
        let mut batch = Batch::new(batch_id, draft.attributes.clone(), actor.id.clone(), now);
        batch.enqueue_fact(FactType::Collection);
        batch
    }

    fn log_rejected_request(&self, op: &str, batch_id: &BatchId, actor: &Actor, err: &WorkflowError) {
        match err {
            WorkflowError::Conflict { .. } => warn!(
                op,
                batch_id = %batch_id,
                actor = %actor,
                error = %err,
                "[hc-01] Request lost a race"
            ),
            _ => debug!(
                op,
                batch_id = %batch_id,
                actor = %actor,
                error = %err,
                "[hc-01] Request refused"
            ),
        }
    }

    async fn run(
        &self,
        op: &str,
        batch_id: &BatchId,
        actor: &Actor,
        mutate: impl FnMut(&mut Batch, Timestamp) -> WorkflowResult<Transition>,
    ) -> WorkflowResult<Batch> {
        match self.commit(batch_id, mutate) {
            Ok(commit) => {
                self.after_commit(actor, &commit).await;
                Ok(commit.batch)
            }
            Err(err) => {
                self.log_rejected_request(op, batch_id, actor, &err);
                Err(err)
            }
        }
    }
}

/// Snapshot attested by a ledger fact.
fn fact_payload(batch: &Batch, fact_type: FactType, actor: &Actor) -> serde_json::Value {
    match fact_type {
        FactType::Collection => json!({
            "batch_id": batch.batch_id,
            "fact_type": fact_type,
            "farmer_id": batch.farmer_id,
            "attributes": batch.attributes,
            "created_at": batch.created_at,
        }),
        FactType::Processing => json!({
            "batch_id": batch.batch_id,
            "fact_type": fact_type,
            "processor_id": batch.processor_id,
            "step": batch.processing_steps.last(),
        }),
        FactType::Completion => json!({
            "batch_id": batch.batch_id,
            "fact_type": fact_type,
            "lab_id": batch.lab_id,
            "test": batch.quality_tests.last(),
        }),
        FactType::Rejection => json!({
            "batch_id": batch.batch_id,
            "fact_type": fact_type,
            "rejected_by": actor,
            "reason": batch.rejection_reason,
            "rejected_at": batch.rejected_at,
            "test": batch
                .quality_tests
                .last()
                .filter(|test| !test.overall_result.is_pass()),
        }),
    }
}

#[async_trait]
impl<R, T> BatchWorkflowApi for BatchWorkflowService<R, T>
where
    R: BatchRepository + 'static,
    T: TimeSource + 'static,
{
    async fn create_batch(&self, actor: &Actor, draft: BatchDraft) -> WorkflowResult<Batch> {
        if actor.role != Role::Collector {
            return Err(WorkflowError::Validation(format!(
                "{} cannot create batches",
                actor.role
            )));
        }
        validate_attributes(&draft.attributes)?;

        let now = self.time.now();
        let batch = match &draft.requested_id {
            Some(requested) => {
                BatchIdentity::validate(requested)?;
                let batch = self.new_batch(requested.clone(), actor, &draft, now);
                self.repository.insert(batch.clone())?;
                batch
            }
            None => {
                let year = BatchIdentity::year_of(now);
                self.identity
                    .allocate(&draft.attributes.herb_species, year, |candidate| {
                        let batch = self.new_batch(candidate, actor, &draft, now);
                        match self.repository.insert(batch.clone()) {
                            Ok(()) => Ok(Some(batch)),
                            Err(WorkflowError::Conflict { .. }) => Ok(None),
                            Err(err) => Err(err),
                        }
                    })?
            }
        };

        info!(
            batch_id = %batch.batch_id,
            farmer_id = %batch.farmer_id,
            species = %batch.attributes.herb_species,
            "[hc-01] Batch created"
        );

        notify::publish(
            self.publisher.as_ref(),
            BatchEvent::Created {
                batch_id: batch.batch_id.clone(),
                farmer_id: batch.farmer_id.clone(),
                herb_species: batch.attributes.herb_species.clone(),
            },
        )
        .await;
        self.dispatch_fact(&batch, FactType::Collection, actor);

        Ok(batch)
    }

    async fn request_transition(
        &self,
        batch_id: &BatchId,
        actor: &Actor,
        target: BatchStatus,
    ) -> WorkflowResult<Batch> {
        self.run("request_transition", batch_id, actor, |batch, now| {
            pool::request(batch, actor, target, now)
        })
        .await
    }

    async fn claim(&self, batch_id: &BatchId, actor: &Actor) -> WorkflowResult<Batch> {
        self.run("claim", batch_id, actor, |batch, now| {
            pool::claim(batch, actor, now)
        })
        .await
    }

    async fn complete(
        &self,
        batch_id: &BatchId,
        actor: &Actor,
        report: CompletionReport,
    ) -> WorkflowResult<Batch> {
        self.run("complete", batch_id, actor, |batch, now| {
            pool::complete(batch, actor, &report, now)
        })
        .await
    }

    async fn reject(
        &self,
        batch_id: &BatchId,
        actor: &Actor,
        reason: &str,
    ) -> WorkflowResult<Batch> {
        self.run("reject", batch_id, actor, |batch, now| {
            pool::reject(batch, actor, reason, now)
        })
        .await
    }

    fn lookup(&self, batch_id: &BatchId) -> WorkflowResult<Batch> {
        self.repository
            .get(batch_id)?
            .ok_or_else(|| WorkflowError::NotFound(batch_id.clone()))
    }

    fn list_claimable(&self, actor: &Actor) -> WorkflowResult<Vec<Batch>> {
        let mut visible: Vec<Batch> = self
            .repository
            .list()?
            .into_iter()
            .filter(|batch| pool::is_visible(batch, actor))
            .collect();
        visible.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.batch_id.cmp(&b.batch_id))
        });
        Ok(visible)
    }
}
