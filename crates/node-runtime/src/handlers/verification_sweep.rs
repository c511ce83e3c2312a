//! # Verification Sweep
//!
//! Periodically re-verifies every batch with a confirmed fact, so ledger
//! drift is noticed without anyone calling `verify`. Findings go out through
//! the reconciler's own log lines and `batch.verification_mismatch`. Each
//! pass first starts chains for facts that were mirrored without a runtime.

use crate::container::SubsystemContainer;
use hc_02_ledger_mirror::VerificationStatus;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Counts from one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepSummary {
    pub checked: usize,
    pub verified: usize,
    pub not_yet_recorded: usize,
    pub integrity_warnings: usize,
    pub unreachable: usize,
    /// Batches that could not be verified at all.
    pub errors: usize,
    /// Stranded facts whose chain this pass started.
    pub redispatched: usize,
}

pub struct VerificationSweep {
    container: Arc<SubsystemContainer>,
    interval: Duration,
}

impl VerificationSweep {
    pub fn new(container: Arc<SubsystemContainer>, interval: Duration) -> Self {
        Self {
            container,
            interval,
        }
    }

    /// Verify every recorded batch once.
    pub async fn sweep_once(&self) -> SweepSummary {
        let mut summary = SweepSummary {
            redispatched: self.container.mirror.redispatch(),
            ..SweepSummary::default()
        };
        let batches = match self.container.recorded_batches() {
            Ok(batches) => batches,
            Err(err) => {
                warn!(error = %err, "[hc-02] Verification sweep could not list batches");
                summary.errors += 1;
                return summary;
            }
        };

        for batch_id in batches {
            summary.checked += 1;
            match self.container.verify(&batch_id).await {
                Ok(result) => match result.status {
                    VerificationStatus::Verified => summary.verified += 1,
                    VerificationStatus::NotYetRecorded => summary.not_yet_recorded += 1,
                    VerificationStatus::IntegrityWarning => summary.integrity_warnings += 1,
                    VerificationStatus::LedgerUnreachable => summary.unreachable += 1,
                },
                Err(err) => {
                    debug!(batch_id = %batch_id, error = %err, "[hc-02] Sweep verify failed");
                    summary.errors += 1;
                }
            }
        }
        summary
    }

    /// Run the sweep loop. The first pass happens one interval after start.
    pub async fn run(self) {
        info!(interval = ?self.interval, "Verification sweep started");
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let summary = self.sweep_once().await;
            if summary.integrity_warnings > 0 || summary.unreachable > 0 {
                warn!(
                    checked = summary.checked,
                    warnings = summary.integrity_warnings,
                    unreachable = summary.unreachable,
                    "[hc-02] Verification sweep found problems"
                );
            } else {
                info!(
                    checked = summary.checked,
                    verified = summary.verified,
                    "[hc-02] Verification sweep complete"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::NodeConfig;
    use hc_01_batch_workflow::{FactRequest, LedgerMirror};
    use hc_02_ledger_mirror::{InMemoryContentStore, InMemoryLedger, LedgerFact};
    use shared_types::{Actor, BatchAttributes, BatchDraft, FactType, MirrorStatus};

    fn draft(id: &str) -> BatchDraft {
        BatchDraft::new(BatchAttributes {
            herb_species: "Ashwagandha".to_string(),
            quantity: 120.0,
            location: "Rajasthan".to_string(),
            quality_grade: "A".to_string(),
            harvest_method: "hand-picked".to_string(),
            organic_certified: true,
        })
        .with_id(id)
    }

    #[tokio::test]
    async fn test_sweep_counts_verified_and_tampered_batches() {
        let ledger = Arc::new(InMemoryLedger::new());
        let container = Arc::new(SubsystemContainer::with_ledger(
            NodeConfig::default(),
            ledger.clone(),
            Arc::new(InMemoryContentStore::new()),
        ));
        let farmer = Actor::collector("farmer-1");
        for id in ["ASH-2024-001", "ASH-2024-002"] {
            container.workflow.create_batch(&farmer, draft(id)).await.unwrap();
        }
        container.mirror.settle().await;

        // A second collection fact that the local record never produced.
        let original = ledger
            .facts()
            .into_iter()
            .find(|f| f.batch_id.as_str() == "ASH-2024-002")
            .unwrap();
        ledger.inject(LedgerFact {
            transaction_ref: "0xforged".to_string(),
            object_hash: "deadbeef".to_string(),
            fact_type: FactType::Collection,
            ..original
        });

        let sweep = VerificationSweep::new(container, Duration::from_secs(60));
        let summary = sweep.sweep_once().await;

        assert_eq!(summary.checked, 2);
        assert_eq!(summary.verified, 1);
        assert_eq!(summary.integrity_warnings, 1);
        assert_eq!(summary.errors, 0);
    }

    #[test]
    fn test_sweep_starts_stranded_chains() {
        let ledger = Arc::new(InMemoryLedger::new());
        let container = Arc::new(SubsystemContainer::with_ledger(
            NodeConfig::default(),
            ledger.clone(),
            Arc::new(InMemoryContentStore::new()),
        ));
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let id = runtime.block_on(async {
            let batch = container
                .workflow
                .create_batch(&Actor::collector("farmer-1"), draft("ASH-2024-003"))
                .await
                .unwrap();
            container.mirror.settle().await;
            batch.batch_id
        });

        // Replay a fact handed to the mirror from a thread with no runtime.
        let mirror = container.mirror.clone();
        let stranded_id = id.clone();
        std::thread::spawn(move || {
            mirror.mirror(FactRequest {
                batch_id: stranded_id.clone(),
                fact_type: FactType::Collection,
                payload: serde_json::json!({ "batch_id": stranded_id.as_str() }),
            });
        })
        .join()
        .unwrap();
        assert_eq!(container.mirror.stranded(), 1);

        let sweep = VerificationSweep::new(container.clone(), Duration::from_secs(60));
        let summary = runtime.block_on(async {
            let summary = sweep.sweep_once().await;
            container.mirror.settle().await;
            summary
        });

        assert_eq!(summary.redispatched, 1);
        assert_eq!(container.mirror.stranded(), 0);
        // The already confirmed fact is not written twice.
        assert_eq!(ledger.transactions(), 1);
        let batch = container.workflow.lookup(&id).unwrap();
        assert_eq!(
            batch.fact(FactType::Collection).map(|f| f.status),
            Some(MirrorStatus::Confirmed)
        );
    }

    #[tokio::test]
    async fn test_sweep_skips_unrecorded_batches() {
        let container = Arc::new(SubsystemContainer::new(NodeConfig::default()));
        let sweep = VerificationSweep::new(container, Duration::from_secs(60));
        assert_eq!(sweep.sweep_once().await, SweepSummary::default());
    }
}
