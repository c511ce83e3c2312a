//! # Verification Reconciler
//!
//! Re-reads the ledger on demand and compares it with the local receipts.
//! Mismatches are surfaced (log + `batch.verification_mismatch`), never
//! auto-corrected.

use crate::domain::{reconcile, LedgerError, LedgerResult, VerificationResult, VerificationStatus};
use crate::notify;
use crate::ports::inbound::VerificationApi;
use crate::ports::outbound::{Ledger, LedgerStateStore};
use async_trait::async_trait;
use shared_bus::{BatchEvent, EventPublisher};
use shared_types::BatchId;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

pub struct VerificationReconciler {
    ledger: Arc<dyn Ledger>,
    state: Arc<dyn LedgerStateStore>,
    publisher: Arc<dyn EventPublisher>,
    query_timeout: Duration,
}

impl VerificationReconciler {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        state: Arc<dyn LedgerStateStore>,
        publisher: Arc<dyn EventPublisher>,
        query_timeout: Duration,
    ) -> Self {
        Self {
            ledger,
            state,
            publisher,
            query_timeout,
        }
    }
}

#[async_trait]
impl VerificationApi for VerificationReconciler {
    async fn verify(&self, batch_id: &BatchId) -> LedgerResult<VerificationResult> {
        let local = self.state.facts(batch_id).await?;
        let local_recorded = local.iter().any(|f| f.state.recorded);

        let queried = timeout(self.query_timeout, self.ledger.query(batch_id))
            .await
            .unwrap_or(Err(LedgerError::Timeout));
        let ledger = match queried {
            Ok(facts) => facts,
            Err(err) => {
                let status = if local_recorded {
                    VerificationStatus::LedgerUnreachable
                } else {
                    VerificationStatus::NotYetRecorded
                };
                debug!(
                    batch_id = %batch_id,
                    error = %err,
                    status = status.as_str(),
                    "[hc-02] Ledger unreadable during verification"
                );
                return Ok(VerificationResult {
                    batch_id: batch_id.clone(),
                    local_recorded,
                    ledger_recorded: false,
                    matches: !local_recorded,
                    status,
                    details: vec![err.to_string()],
                    in_progress: Vec::new(),
                });
            }
        };

        let result = reconcile(batch_id, &local, &ledger);
        if result.status == VerificationStatus::IntegrityWarning {
            warn!(
                batch_id = %batch_id,
                details = ?result.details,
                "[hc-02] Ledger disagrees with local record"
            );
            notify::publish(
                self.publisher.as_ref(),
                BatchEvent::VerificationMismatch {
                    batch_id: batch_id.clone(),
                    details: result.details.clone(),
                },
            )
            .await;
        } else {
            debug!(
                batch_id = %batch_id,
                status = result.status.as_str(),
                in_progress = ?result.in_progress,
                "[hc-02] Verified"
            );
        }

        Ok(result)
    }
}
