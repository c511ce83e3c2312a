//! # Ledger Outages
//!
//! The workflow never waits on the ledger: an unreachable or flaky ledger
//! changes what the mirror reports, never what role actors can do.

#[cfg(test)]
mod tests {
    use crate::integration::fixtures::*;
    use hc_02_ledger_mirror::VerificationStatus;
    use node_runtime::{LedgerMode, NodeRuntime};
    use shared_bus::{BatchEvent, EventFilter, EventTopic};
    use shared_types::{BatchId, BatchStatus, MirrorStatus};

    #[tokio::test]
    async fn test_unreachable_ledger_does_not_block_the_workflow() {
        let (container, ledger) = node(fast_config(3));
        ledger.set_reachable(false);
        let mut ledger_events = container
            .event_bus
            .subscribe(EventFilter::topics(vec![EventTopic::Ledger]));

        let id = walk_to_completed(&container, ASH_001).await;
        container.mirror.settle().await;

        let batch = container.workflow.lookup(&id).unwrap();
        assert_eq!(batch.status, BatchStatus::Completed);
        assert!(!batch.ledger_state.recorded);
        assert!(batch.ledger_state.transaction_ref.is_none());
        assert_eq!(batch.ledger_state.attempts, 3);
        assert!(batch.ledger_state.last_error.is_some());
        assert!(batch
            .ledger_facts
            .iter()
            .all(|f| f.status == MirrorStatus::Failed));
        assert!(batch.ledger_consistent());
        // Three facts, three attempts each, no successful submit.
        assert_eq!(ledger.submissions(), 9);
        assert_eq!(ledger.transactions(), 0);

        let mut failed = 0;
        while let Ok(Some(event)) = ledger_events.try_recv() {
            assert!(matches!(event, BatchEvent::LedgerFailed { attempts: 3, .. }));
            failed += 1;
        }
        assert_eq!(failed, 3);

        let result = container.verify(&id).await.unwrap();
        assert_eq!(result.status, VerificationStatus::NotYetRecorded);
        assert!(!result.local_recorded);
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried_to_confirmation() {
        let (container, ledger) = node(fast_config(5));
        ledger.fail_next(2);

        let id = BatchId::new(ASH_001);
        container
            .workflow
            .create_batch(&shared_types::Actor::collector("farmer-1"), ashwagandha(ASH_001))
            .await
            .unwrap();
        container.mirror.settle().await;

        let batch = container.workflow.lookup(&id).unwrap();
        assert_eq!(batch.status, BatchStatus::Recorded);
        assert!(batch.ledger_state.recorded);
        assert_eq!(batch.ledger_state.attempts, 2);
        assert_eq!(ledger.transactions(), 1);
    }

    #[tokio::test]
    async fn test_ledger_lost_after_recording_is_reported_unreachable() {
        let (container, ledger) = node(fast_config(3));
        let id = walk_to_completed(&container, ASH_001).await;
        container.mirror.settle().await;

        ledger.set_reachable(false);
        let result = container.verify(&id).await.unwrap();
        assert_eq!(result.status, VerificationStatus::LedgerUnreachable);
        assert!(result.local_recorded);
        assert!(!result.details.is_empty());
    }

    #[tokio::test]
    async fn test_disabled_ledger_mode() {
        let mut config = fast_config(2);
        config.ledger.mode = LedgerMode::Disabled;
        let runtime = NodeRuntime::new(config);
        runtime.start();

        let id = walk_to_completed(runtime.container(), "ASH-2024-003").await;
        runtime.shutdown().await;

        let batch = runtime.container().workflow.lookup(&id).unwrap();
        assert_eq!(batch.status, BatchStatus::Completed);
        assert!(!batch.ledger_state.recorded);
        assert_eq!(
            batch.ledger_state.last_error.as_deref(),
            Some("Ledger unavailable: ledger not configured")
        );
        assert_eq!(
            runtime
                .audit_trail()
                .names_for(&id)
                .iter()
                .filter(|n| **n == "batch.ledger_failed")
                .count(),
            3
        );
    }
}
