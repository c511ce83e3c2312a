//! Ledger-side records and recorder outcomes.

use serde::{Deserialize, Serialize};
use shared_types::{BatchId, FactReceipt, FactType, LedgerState, Timestamp};

/// Acknowledgement of a mined recording transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerReceipt {
    pub transaction_ref: String,
    /// Block height.
    pub block_ref: u64,
}

/// A fact as the ledger stores it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerFact {
    pub batch_id: BatchId,
    pub fact_type: FactType,
    pub object_hash: String,
    pub transaction_ref: String,
    pub block_ref: u64,
    pub recorded_at: Timestamp,
}

impl LedgerFact {
    pub fn receipt(&self) -> LedgerReceipt {
        LedgerReceipt {
            transaction_ref: self.transaction_ref.clone(),
            block_ref: self.block_ref,
        }
    }
}

/// Result of one `record` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    /// This call confirmed the fact.
    Confirmed(FactReceipt),
    /// An earlier chain already confirmed it.
    AlreadyRecorded(LedgerState),
    /// Another chain for the same fact is running.
    InFlight,
    /// The chain ended without confirmation (now or earlier).
    Failed { attempts: u32, last_error: String },
}

impl RecordOutcome {
    pub fn is_recorded(&self) -> bool {
        matches!(self, Self::Confirmed(_) | Self::AlreadyRecorded(_))
    }

    /// Metric label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Confirmed(_) => "confirmed",
            Self::AlreadyRecorded(_) => "already_recorded",
            Self::InFlight => "in_flight",
            Self::Failed { .. } => "failed",
        }
    }
}
