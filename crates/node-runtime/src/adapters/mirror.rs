//! # Recorder Mirror
//!
//! `LedgerMirror` for the batch workflow: every enqueued fact starts an
//! attempt chain on the `LedgerRecorder` in a background task. The
//! workflow call that committed the transition has already returned by the
//! time the ledger is touched.
//!
//! A fact mirrored outside a tokio runtime cannot start its chain. It is
//! held as stranded until `redispatch` runs inside one (node start and every
//! verification sweep).

use hc_01_batch_workflow::{FactRequest, LedgerMirror};
use hc_02_ledger_mirror::{LedgerRecorder, LedgerResult, RecordOutcome};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub struct RecorderMirror {
    recorder: Arc<LedgerRecorder>,
    chains: Mutex<Vec<JoinHandle<LedgerResult<RecordOutcome>>>>,
    stranded: Mutex<Vec<FactRequest>>,
}

impl RecorderMirror {
    pub fn new(recorder: Arc<LedgerRecorder>) -> Self {
        Self {
            recorder,
            chains: Mutex::new(Vec::new()),
            stranded: Mutex::new(Vec::new()),
        }
    }

    /// Facts waiting for a runtime to start their chain.
    pub fn stranded(&self) -> usize {
        self.stranded.lock().len()
    }

    /// Start chains for stranded facts. Returns how many were started.
    pub fn redispatch(&self) -> usize {
        if tokio::runtime::Handle::try_current().is_err() {
            return 0;
        }
        let requests = std::mem::take(&mut *self.stranded.lock());
        let count = requests.len();
        for request in requests {
            info!(
                batch_id = %request.batch_id,
                fact = %request.fact_type,
                "[hc-02] Starting stranded ledger chain"
            );
            self.start(request);
        }
        count
    }

    fn start(&self, request: FactRequest) {
        let handle =
            self.recorder
                .spawn_record(request.batch_id, request.fact_type, request.payload);

        let mut chains = self.chains.lock();
        chains.retain(|h| !h.is_finished());
        chains.push(handle);
    }

    /// Chains spawned and not yet finished.
    pub fn running(&self) -> usize {
        self.chains.lock().iter().filter(|h| !h.is_finished()).count()
    }

    /// Wait until every spawned chain has ended. Returns how many ended.
    ///
    /// Chains spawned while waiting are awaited too.
    pub async fn settle(&self) -> usize {
        let mut settled = 0;
        loop {
            let chains = std::mem::take(&mut *self.chains.lock());
            if chains.is_empty() {
                return settled;
            }
            for chain in chains {
                if let Err(err) = chain.await {
                    warn!(error = %err, "[hc-02] Ledger chain task aborted");
                }
                settled += 1;
            }
        }
    }
}

impl LedgerMirror for RecorderMirror {
    fn mirror(&self, request: FactRequest) {
        if tokio::runtime::Handle::try_current().is_err() {
            warn!(
                batch_id = %request.batch_id,
                fact = %request.fact_type,
                "[hc-02] No async runtime; fact held until redispatch"
            );
            self.stranded.lock().push(request);
            return;
        }

        debug!(
            batch_id = %request.batch_id,
            fact = %request.fact_type,
            "[hc-02] Starting ledger chain"
        );
        self.start(request);
    }
}
