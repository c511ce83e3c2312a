//! # Batch Events
//!
//! Every notification that flows through the shared bus.

use serde::{Deserialize, Serialize};
use shared_types::entities::{ActorId, BatchId, BatchStatus, FactType, Role};

/// Subsystem id of the batch workflow.
pub const WORKFLOW_SUBSYSTEM: u8 = 1;
/// Subsystem id of the ledger mirror.
pub const LEDGER_SUBSYSTEM: u8 = 2;

/// All events that can be published to the event bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BatchEvent {
    // =========================================================================
    // SUBSYSTEM 1: BATCH WORKFLOW
    // =========================================================================
    /// A collector registered a new batch.
    Created {
        batch_id: BatchId,
        farmer_id: ActorId,
        herb_species: String,
    },

    /// A role actor won the claim on a batch.
    Claimed {
        batch_id: BatchId,
        role: Role,
        actor_id: ActorId,
        status: BatchStatus,
    },

    /// A committed status transition.
    StatusChanged {
        batch_id: BatchId,
        from: BatchStatus,
        to: BatchStatus,
        role: Role,
        actor_id: ActorId,
    },

    // =========================================================================
    // SUBSYSTEM 2: LEDGER MIRROR
    // =========================================================================
    /// A fact was confirmed on the ledger.
    LedgerRecorded {
        batch_id: BatchId,
        fact_type: FactType,
        transaction_ref: String,
        block_ref: u64,
        /// Failed attempts before confirmation.
        attempts: u32,
    },

    /// A fact's attempt chain ended without confirmation.
    LedgerFailed {
        batch_id: BatchId,
        fact_type: FactType,
        attempts: u32,
        last_error: String,
    },

    /// The ledger disagrees with the local record.
    VerificationMismatch {
        batch_id: BatchId,
        details: Vec<String>,
    },
}

impl BatchEvent {
    /// Public notification name, e.g. `batch.claimed`.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Created { .. } => "batch.created",
            Self::Claimed { .. } => "batch.claimed",
            Self::StatusChanged { .. } => "batch.status_changed",
            Self::LedgerRecorded { .. } => "batch.ledger_recorded",
            Self::LedgerFailed { .. } => "batch.ledger_failed",
            Self::VerificationMismatch { .. } => "batch.verification_mismatch",
        }
    }

    /// Get the topic for this event (for filtering).
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::Created { .. } | Self::Claimed { .. } | Self::StatusChanged { .. } => {
                EventTopic::Workflow
            }
            Self::LedgerRecorded { .. } | Self::LedgerFailed { .. } => EventTopic::Ledger,
            Self::VerificationMismatch { .. } => EventTopic::Verification,
        }
    }

    /// Get the originating subsystem ID.
    #[must_use]
    pub fn source_subsystem(&self) -> u8 {
        match self.topic() {
            EventTopic::Workflow => WORKFLOW_SUBSYSTEM,
            _ => LEDGER_SUBSYSTEM,
        }
    }

    /// The batch this event concerns.
    #[must_use]
    pub fn batch_id(&self) -> &BatchId {
        match self {
            Self::Created { batch_id, .. }
            | Self::Claimed { batch_id, .. }
            | Self::StatusChanged { batch_id, .. }
            | Self::LedgerRecorded { batch_id, .. }
            | Self::LedgerFailed { batch_id, .. }
            | Self::VerificationMismatch { batch_id, .. } => batch_id,
        }
    }
}

/// Event topics for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    /// Created, claimed and status changes.
    Workflow,
    /// Ledger mirror outcomes.
    Ledger,
    /// Reconciliation warnings.
    Verification,
    /// All events (no filtering).
    All,
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
    /// Batches to include. Empty means all batches.
    pub batch_ids: Vec<BatchId>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self {
            topics,
            batch_ids: Vec::new(),
        }
    }

    /// Create a filter following a single batch.
    #[must_use]
    pub fn batch(batch_id: BatchId) -> Self {
        Self {
            topics: Vec::new(),
            batch_ids: vec![batch_id],
        }
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &BatchEvent) -> bool {
        let topic_match = self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&event.topic());

        let batch_match = self.batch_ids.is_empty() || self.batch_ids.contains(event.batch_id());

        topic_match && batch_match
    }
}
