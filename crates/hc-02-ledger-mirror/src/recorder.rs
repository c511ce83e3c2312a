//! # Ledger Recorder
//!
//! Idempotent, retryable "record this fact" over the ledger and the
//! content-addressed store. One attempt chain per fact: the chain's state
//! lives in the fact's receipt, and a process-local in-flight set keeps two
//! chains for the same fact from running at once.
//!
//! ## Attempt chain
//!
//! ```text
//! load receipt ── confirmed ──▶ AlreadyRecorded
//!      │          failed ─────▶ Failed (never retried)
//!      ▼
//! serialize ── error ─────────▶ Failed (permanent)
//!      ▼
//! ┌─▶ (after a failure) query ledger for fact + hash ── found ──▶ Confirmed
//! │    │ query failed after an ambiguous attempt ──▶ counts as a failed attempt
//! │    ▼
//! │   put + submit (bounded by attempt_timeout) ── ok ──▶ Confirmed
//! │    ▼ transient error
//! └── attempts < max ? sleep(backoff) : Failed
//! ```
//!
//! A submit that timed out may still have been mined. Until a successful
//! query shows the fact absent, the chain never submits it again.

use crate::domain::{LedgerError, LedgerReceipt, LedgerResult, RecordOutcome, RetryPolicy};
use crate::notify;
use crate::ports::inbound::FactRecorderApi;
use crate::ports::outbound::{ContentAddressStore, Ledger, LedgerStateStore};
use async_trait::async_trait;
use parking_lot::Mutex;
use shared_bus::{BatchEvent, EventPublisher};
use shared_types::{BatchId, FactReceipt, FactType, LedgerState, MirrorStatus};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(10);

/// Recorder tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecorderConfig {
    pub retry: RetryPolicy,
    /// Upper bound on one put + submit, and on each ledger query.
    pub attempt_timeout: Duration,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
        }
    }
}

type FactKey = (BatchId, FactType);

/// Removes the fact from the in-flight set when the chain ends.
struct InFlightGuard<'a> {
    set: &'a Mutex<HashSet<FactKey>>,
    key: FactKey,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.set.lock().remove(&self.key);
    }
}

pub struct LedgerRecorder {
    ledger: Arc<dyn Ledger>,
    content: Arc<dyn ContentAddressStore>,
    state: Arc<dyn LedgerStateStore>,
    publisher: Arc<dyn EventPublisher>,
    config: RecorderConfig,
    in_flight: Mutex<HashSet<FactKey>>,
}

impl LedgerRecorder {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        content: Arc<dyn ContentAddressStore>,
        state: Arc<dyn LedgerStateStore>,
        publisher: Arc<dyn EventPublisher>,
        config: RecorderConfig,
    ) -> Self {
        Self {
            ledger,
            content,
            state,
            publisher,
            config,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    /// Facts whose chain is currently running.
    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().len()
    }

    /// Run `record` as a background task.
    pub fn spawn_record(
        self: &Arc<Self>,
        batch_id: BatchId,
        fact_type: FactType,
        payload: serde_json::Value,
    ) -> JoinHandle<LedgerResult<RecordOutcome>> {
        let recorder = Arc::clone(self);
        tokio::spawn(async move {
            let outcome = recorder.record(&batch_id, fact_type, &payload).await;
            if let Err(err) = &outcome {
                error!(
                    batch_id = %batch_id,
                    fact = %fact_type,
                    error = %err,
                    "[hc-02] Fact receipt could not be read or persisted"
                );
            }
            outcome
        })
    }

    fn begin(&self, batch_id: &BatchId, fact_type: FactType) -> Option<InFlightGuard<'_>> {
        let key = (batch_id.clone(), fact_type);
        if !self.in_flight.lock().insert(key.clone()) {
            return None;
        }
        Some(InFlightGuard {
            set: &self.in_flight,
            key,
        })
    }

    /// One put + submit. Records the object hash on `state` once known.
    async fn attempt(
        &self,
        batch_id: &BatchId,
        fact_type: FactType,
        bytes: &[u8],
        state: &mut LedgerState,
    ) -> LedgerResult<(String, LedgerReceipt)> {
        let hash = self.content.put(bytes.to_vec()).await?;
        state.object_hash = Some(hash.clone());
        let receipt = self.ledger.submit(batch_id, fact_type, &hash).await?;
        Ok((hash, receipt))
    }

    /// Lost-acknowledgement recovery: a previous attempt may have landed.
    async fn find_existing(
        &self,
        batch_id: &BatchId,
        fact_type: FactType,
        object_hash: &str,
    ) -> LedgerResult<Option<LedgerReceipt>> {
        let facts = timeout(self.config.attempt_timeout, self.ledger.query(batch_id))
            .await
            .unwrap_or(Err(LedgerError::Timeout))?;
        Ok(facts
            .iter()
            .find(|f| f.fact_type == fact_type && f.object_hash == object_hash)
            .map(|f| f.receipt()))
    }

    /// One step of the chain: settle any earlier ambiguous attempt, then
    /// put + submit. `unsettled` is true while an earlier submit may have
    /// been written without an acknowledgement.
    async fn step(
        &self,
        batch_id: &BatchId,
        fact_type: FactType,
        bytes: &[u8],
        state: &mut LedgerState,
        unsettled: &mut bool,
    ) -> LedgerResult<(String, LedgerReceipt)> {
        if let Some(hash) = state.object_hash.clone().filter(|_| state.attempts > 0) {
            match self.find_existing(batch_id, fact_type, &hash).await {
                Ok(Some(found)) => {
                    info!(
                        batch_id = %batch_id,
                        fact = %fact_type,
                        "[hc-02] Adopting ledger entry from an unacknowledged attempt"
                    );
                    return Ok((hash, found));
                }
                Ok(None) => *unsettled = false,
                Err(err) if *unsettled => {
                    warn!(
                        batch_id = %batch_id,
                        fact = %fact_type,
                        error = %err,
                        "[hc-02] Cannot tell whether the last submit landed; not resubmitting"
                    );
                    return Err(err);
                }
                Err(err) => {
                    debug!(batch_id = %batch_id, error = %err, "[hc-02] Ledger query before retry failed");
                }
            }
        }

        debug!(
            batch_id = %batch_id,
            fact = %fact_type,
            attempt = state.attempts + 1,
            "[hc-02] Submitting fact"
        );
        let result = timeout(
            self.config.attempt_timeout,
            self.attempt(batch_id, fact_type, bytes, state),
        )
        .await
        .unwrap_or(Err(LedgerError::Timeout));
        if let Err(err) = &result {
            if err.may_have_landed() && state.object_hash.is_some() {
                *unsettled = true;
            }
        }
        result
    }

    async fn finish_confirmed(
        &self,
        batch_id: &BatchId,
        fact_type: FactType,
        state: &LedgerState,
        object_hash: &str,
        ledger_receipt: LedgerReceipt,
    ) -> LedgerResult<RecordOutcome> {
        let receipt = FactReceipt {
            fact_type,
            status: MirrorStatus::Confirmed,
            state: state.confirmed(
                ledger_receipt.transaction_ref.clone(),
                ledger_receipt.block_ref,
                object_hash,
            ),
        };
        self.state.store(batch_id, receipt.clone()).await?;

        info!(
            batch_id = %batch_id,
            fact = %fact_type,
            tx = %ledger_receipt.transaction_ref,
            block = %ledger_receipt.block_ref,
            failed_attempts = state.attempts,
            "[hc-02] Fact recorded on ledger"
        );
        notify::publish(
            self.publisher.as_ref(),
            BatchEvent::LedgerRecorded {
                batch_id: batch_id.clone(),
                fact_type,
                transaction_ref: ledger_receipt.transaction_ref,
                block_ref: ledger_receipt.block_ref,
                attempts: state.attempts,
            },
        )
        .await;

        Ok(RecordOutcome::Confirmed(receipt))
    }

    async fn finish_failed(
        &self,
        batch_id: &BatchId,
        fact_type: FactType,
        state: LedgerState,
    ) -> LedgerResult<RecordOutcome> {
        let last_error = state
            .last_error
            .clone()
            .unwrap_or_else(|| "no attempts allowed".to_string());
        let attempts = state.attempts;
        self.state
            .store(
                batch_id,
                FactReceipt {
                    fact_type,
                    status: MirrorStatus::Failed,
                    state,
                },
            )
            .await?;

        error!(
            batch_id = %batch_id,
            fact = %fact_type,
            attempts,
            last_error = %last_error,
            "[hc-02] Fact not recorded; chain ended"
        );
        notify::publish(
            self.publisher.as_ref(),
            BatchEvent::LedgerFailed {
                batch_id: batch_id.clone(),
                fact_type,
                attempts,
                last_error: last_error.clone(),
            },
        )
        .await;

        Ok(RecordOutcome::Failed {
            attempts,
            last_error,
        })
    }
}

#[async_trait]
impl FactRecorderApi for LedgerRecorder {
    async fn record(
        &self,
        batch_id: &BatchId,
        fact_type: FactType,
        payload: &serde_json::Value,
    ) -> LedgerResult<RecordOutcome> {
        let Some(_guard) = self.begin(batch_id, fact_type) else {
            debug!(batch_id = %batch_id, fact = %fact_type, "[hc-02] Chain already running");
            return Ok(RecordOutcome::InFlight);
        };

        let receipt = self
            .state
            .load(batch_id, fact_type)
            .await?
            .ok_or_else(|| {
                LedgerError::StateStore(format!("{fact_type} fact was never enqueued for {batch_id}"))
            })?;

        match receipt.status {
            MirrorStatus::Confirmed => return Ok(RecordOutcome::AlreadyRecorded(receipt.state)),
            MirrorStatus::Failed => {
                return Ok(RecordOutcome::Failed {
                    attempts: receipt.state.attempts,
                    last_error: receipt.state.last_error.unwrap_or_default(),
                })
            }
            MirrorStatus::Pending if receipt.state.recorded => {
                return Ok(RecordOutcome::AlreadyRecorded(receipt.state))
            }
            MirrorStatus::Pending => {}
        }

        let mut state = receipt.state;
        let bytes = match serde_json::to_vec(payload) {
            Ok(bytes) => bytes,
            Err(err) => {
                let state = state.with_failed_attempt(LedgerError::from(err).to_string());
                return self.finish_failed(batch_id, fact_type, state).await;
            }
        };

        let retry = self.config.retry;
        // A chain resumed from a stored receipt cannot know how its last
        // submit ended.
        let mut unsettled = state.attempts > 0 && state.object_hash.is_some();
        while retry.allows_retry(state.attempts) {
            let result = self
                .step(batch_id, fact_type, &bytes, &mut state, &mut unsettled)
                .await;

            let err = match result {
                Ok((hash, ledger_receipt)) => {
                    return self
                        .finish_confirmed(batch_id, fact_type, &state, &hash, ledger_receipt)
                        .await;
                }
                Err(err) => err,
            };

            state = state.with_failed_attempt(err.to_string());
            if !err.is_transient() {
                break;
            }
            if !retry.allows_retry(state.attempts) {
                break;
            }

            let delay = retry.delay_with_jitter(state.attempts, rand::random::<f64>());
            warn!(
                batch_id = %batch_id,
                fact = %fact_type,
                attempts = state.attempts,
                error = %err,
                retry_in_ms = delay.as_millis() as u64,
                "[hc-02] Ledger attempt failed; retrying"
            );
            self.state
                .store(
                    batch_id,
                    FactReceipt {
                        fact_type,
                        status: MirrorStatus::Pending,
                        state: state.clone(),
                    },
                )
                .await?;
            tokio::time::sleep(delay).await;
        }

        self.finish_failed(batch_id, fact_type, state).await
    }
}
