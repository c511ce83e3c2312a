//! # Supply Chain Flow
//!
//! A batch from the collector to the lab, with two processors racing for
//! the claim, the ledger mirroring each fact behind the workflow, and a
//! final verification against the ledger.
//!
//! ```text
//! collector ──create──▶ pending ──(collection confirmed)──▶ recorded
//!                                  proc A / proc B race ──claim──▶ processing
//!                                  winner ──complete──▶ awaiting_test
//!                                  lab ──claim──▶ tested ──pass──▶ completed
//! ```

#[cfg(test)]
mod tests {
    use crate::integration::fixtures::*;
    use hc_01_batch_workflow::WorkflowError;
    use hc_02_ledger_mirror::VerificationStatus;
    use node_runtime::NodeRuntime;
    use shared_bus::{EventFilter, EventTopic};
    use shared_types::{Actor, BatchId, BatchStatus, FactType, MirrorStatus, TestOutcome};
    use std::sync::Arc;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_ash_2024_001_end_to_end() {
        let (container, ledger) = node(fast_config(5));
        let id = BatchId::new(ASH_001);

        let created = container
            .workflow
            .create_batch(&Actor::collector("farmer-1"), ashwagandha(ASH_001))
            .await
            .unwrap();
        assert_eq!(created.batch_id, id);
        assert_eq!(created.status, BatchStatus::Pending);

        // Processors A and B claim at the same time.
        let mut racers = Vec::new();
        for name in ["proc-a", "proc-b"] {
            let container = Arc::clone(&container);
            let id = id.clone();
            racers.push(tokio::spawn(async move {
                let actor = Actor::processor(name);
                let result = container.workflow.claim(&id, &actor).await;
                (actor, result)
            }));
        }
        let mut winner = None;
        let mut conflicts = 0;
        for racer in racers {
            let (actor, result) = racer.await.unwrap();
            match result {
                Ok(batch) => {
                    assert_eq!(batch.processor_id.as_ref(), Some(&actor.id));
                    winner = Some(actor);
                }
                Err(WorkflowError::Conflict { .. }) => conflicts += 1,
                Err(other) => panic!("unexpected claim error: {other}"),
            }
        }
        let processor = winner.expect("one claim wins");
        assert_eq!(conflicts, 1);

        let processed = container
            .workflow
            .complete(&id, &processor, drying())
            .await
            .unwrap();
        assert_eq!(processed.status, BatchStatus::AwaitingTest);
        assert_eq!(processed.processing_steps.len(), 1);

        let lab = Actor::laboratory("lab-l");
        container.workflow.claim(&id, &lab).await.unwrap();
        let completed = container
            .workflow
            .complete(&id, &lab, lab_result(TestOutcome::Pass))
            .await
            .unwrap();
        assert_eq!(completed.status, BatchStatus::Completed);
        assert!(completed.tested_at.is_some());

        container.mirror.settle().await;

        let batch = container.workflow.lookup(&id).unwrap();
        assert_eq!(batch.status, BatchStatus::Completed);
        let facts: Vec<(FactType, MirrorStatus)> = batch
            .ledger_facts
            .iter()
            .map(|f| (f.fact_type, f.status))
            .collect();
        assert_eq!(
            facts,
            vec![
                (FactType::Collection, MirrorStatus::Confirmed),
                (FactType::Processing, MirrorStatus::Confirmed),
                (FactType::Completion, MirrorStatus::Confirmed),
            ]
        );
        assert!(batch.ledger_state.recorded);
        assert!(batch.ledger_consistent());
        assert!(batch.processing_steps[0].ledger_ref.is_some());
        assert!(batch.quality_tests[0].ledger_ref.is_some());
        assert_eq!(ledger.transactions(), 3);

        let result = container.verify(&id).await.unwrap();
        assert_eq!(result.status, VerificationStatus::Verified);
        assert!(result.matches);
        assert!(result.details.is_empty());
    }

    #[tokio::test]
    async fn test_lab_failure_rejects_and_records_rejection() {
        let (container, _ledger) = node(fast_config(5));
        let id = BatchId::new("ASH-2024-002");
        let processor = Actor::processor("proc-a");
        let lab = Actor::laboratory("lab-l");
        let workflow = &container.workflow;

        workflow
            .create_batch(&Actor::collector("farmer-1"), ashwagandha(id.as_str()))
            .await
            .unwrap();
        workflow.claim(&id, &processor).await.unwrap();
        workflow.complete(&id, &processor, drying()).await.unwrap();
        workflow.claim(&id, &lab).await.unwrap();
        let rejected = workflow
            .complete(&id, &lab, lab_result(TestOutcome::Fail))
            .await
            .unwrap();
        assert_eq!(rejected.status, BatchStatus::Rejected);
        assert!(rejected.rejected_at.is_some());

        // Terminal: nobody moves it again.
        let err = workflow
            .request_transition(&id, &lab, BatchStatus::Completed)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidTransition { .. }));

        container.mirror.settle().await;
        let batch = workflow.lookup(&id).unwrap();
        assert_eq!(
            batch.fact(FactType::Rejection).map(|f| f.status),
            Some(MirrorStatus::Confirmed)
        );
        assert_eq!(
            container.verify(&id).await.unwrap().status,
            VerificationStatus::Verified
        );
    }

    #[tokio::test]
    async fn test_claimable_lists_follow_the_batch() {
        let (container, _ledger) = node(fast_config(5));
        let id = BatchId::new(ASH_001);
        let processor = Actor::processor("proc-a");
        let lab = Actor::laboratory("lab-l");
        let workflow = &container.workflow;

        workflow
            .create_batch(&Actor::collector("farmer-1"), ashwagandha(ASH_001))
            .await
            .unwrap();
        assert_eq!(workflow.list_claimable(&processor).unwrap().len(), 1);
        assert!(workflow.list_claimable(&lab).unwrap().is_empty());

        workflow.claim(&id, &processor).await.unwrap();
        workflow.complete(&id, &processor, drying()).await.unwrap();

        // The winner keeps seeing its own batch; other processors do not.
        let mine = workflow.list_claimable(&processor).unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].processor_id.as_ref(), Some(&processor.id));
        assert!(workflow
            .list_claimable(&Actor::processor("proc-b"))
            .unwrap()
            .is_empty());
        assert_eq!(workflow.list_claimable(&lab).unwrap()[0].batch_id, id);
    }

    #[tokio::test]
    async fn test_runtime_announces_the_lifecycle() {
        let runtime = NodeRuntime::new(fast_config(5));
        runtime.start();
        let mut workflow_events = runtime
            .container()
            .event_bus
            .subscribe(EventFilter::topics(vec![EventTopic::Workflow]));

        let id = walk_to_completed(runtime.container(), ASH_001).await;
        runtime.shutdown().await;

        let mut names = Vec::new();
        while let Ok(Some(event)) = workflow_events.try_recv() {
            assert_eq!(event.batch_id(), &id);
            names.push(event.name());
        }
        // Collection may confirm before or after the processor's claim.
        assert_eq!(names.first(), Some(&"batch.created"));
        assert_eq!(
            names.iter().filter(|n| **n == "batch.claimed").count(),
            2
        );
        assert_eq!(names.last(), Some(&"batch.status_changed"));

        let trail = runtime.audit_trail().names_for(&id);
        assert_eq!(
            trail
                .iter()
                .filter(|n| **n == "batch.ledger_recorded")
                .count(),
            3
        );
    }
}
