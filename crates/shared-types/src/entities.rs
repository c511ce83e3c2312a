//! # Core Domain Entities
//!
//! The batch aggregate and the value types shared by the workflow and
//! ledger mirror subsystems.
//!
//! ## Clusters
//!
//! - **Identity**: `BatchId`, `ActorId`, `Actor`, `Role`
//! - **Workflow**: `Batch`, `BatchStatus`, `BatchAttributes`
//! - **Records**: `ProcessingStep`, `QualityTest`, `TestOutcome`
//! - **Ledger Mirror**: `FactType`, `LedgerState`, `MirrorStatus`, `FactReceipt`

use crate::errors::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Milliseconds since the UNIX epoch.
pub type Timestamp = u64;

// =============================================================================
// CLUSTER A: IDENTITY
// =============================================================================

/// Globally unique, human-readable batch identifier (e.g. `ASH-2024-001`).
///
/// Construction does not validate the shape; `BatchIdentity` in the workflow
/// subsystem owns generation and validation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchId(String);

impl BatchId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BatchId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for BatchId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Identifier of a role actor as supplied by the auth layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(String);

impl ActorId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ActorId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ActorId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Supply-chain role. Permissions live in the workflow transition table,
/// never on the role itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Collector,
    Processor,
    Laboratory,
    Manufacturer,
    Verifier,
    /// Internal actor used for ledger-driven transitions.
    System,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::Collector,
        Role::Processor,
        Role::Laboratory,
        Role::Manufacturer,
        Role::Verifier,
        Role::System,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Collector => "collector",
            Role::Processor => "processor",
            Role::Laboratory => "laboratory",
            Role::Manufacturer => "manufacturer",
            Role::Verifier => "verifier",
            Role::System => "system",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| ParseError::UnknownRole(s.to_string()))
    }
}

/// An authenticated `(actor_id, role)` pair. Trusted as given.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor {
    pub id: ActorId,
    pub role: Role,
}

impl Actor {
    pub fn new(id: impl Into<ActorId>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
        }
    }

    pub fn collector(id: impl Into<ActorId>) -> Self {
        Self::new(id, Role::Collector)
    }

    pub fn processor(id: impl Into<ActorId>) -> Self {
        Self::new(id, Role::Processor)
    }

    pub fn laboratory(id: impl Into<ActorId>) -> Self {
        Self::new(id, Role::Laboratory)
    }

    pub fn manufacturer(id: impl Into<ActorId>) -> Self {
        Self::new(id, Role::Manufacturer)
    }

    pub fn verifier(id: impl Into<ActorId>) -> Self {
        Self::new(id, Role::Verifier)
    }

    /// The internal actor that applies ledger confirmations.
    pub fn system() -> Self {
        Self::new("system", Role::System)
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.role, self.id)
    }
}

// =============================================================================
// CLUSTER B: WORKFLOW
// =============================================================================

/// Canonical batch status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    /// Created by a collector, collection fact not yet confirmed.
    Pending,
    /// Collection fact confirmed on the ledger.
    Recorded,
    /// Claimed by a processor.
    Processing,
    /// Processing report filed, ready for lab testing.
    AwaitingTest,
    /// Claimed by a laboratory.
    Tested,
    /// Passed lab testing.
    Completed,
    /// Terminal.
    Rejected,
}

impl BatchStatus {
    pub const ALL: [BatchStatus; 7] = [
        BatchStatus::Pending,
        BatchStatus::Recorded,
        BatchStatus::Processing,
        BatchStatus::AwaitingTest,
        BatchStatus::Tested,
        BatchStatus::Completed,
        BatchStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Pending => "pending",
            BatchStatus::Recorded => "recorded",
            BatchStatus::Processing => "processing",
            BatchStatus::AwaitingTest => "awaiting_test",
            BatchStatus::Tested => "tested",
            BatchStatus::Completed => "completed",
            BatchStatus::Rejected => "rejected",
        }
    }

    /// `rejected` is absorbing.
    pub fn is_terminal(&self) -> bool {
        matches!(self, BatchStatus::Rejected)
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BatchStatus {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BatchStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseError::UnknownStatus(s.to_string()))
    }
}

/// Descriptive attributes fixed at creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchAttributes {
    pub herb_species: String,
    /// Quantity in kilograms.
    pub quantity: f64,
    pub location: String,
    pub quality_grade: String,
    pub harvest_method: String,
    pub organic_certified: bool,
}

/// Collector input for `create_batch`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchDraft {
    pub attributes: BatchAttributes,
    /// Explicit id; generated from the species when absent.
    #[serde(default)]
    pub requested_id: Option<BatchId>,
}

impl BatchDraft {
    pub fn new(attributes: BatchAttributes) -> Self {
        Self {
            attributes,
            requested_id: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<BatchId>) -> Self {
        self.requested_id = Some(id.into());
        self
    }
}

/// Batch root aggregate. The authoritative local record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub batch_id: BatchId,
    #[serde(flatten)]
    pub attributes: BatchAttributes,
    pub status: BatchStatus,
    /// Creating collector.
    pub farmer_id: ActorId,
    pub processor_id: Option<ActorId>,
    pub lab_id: Option<ActorId>,
    /// Mirror of the most recently enqueued fact.
    pub ledger_state: LedgerState,
    /// One receipt per logical fact, in enqueue order.
    pub ledger_facts: Vec<FactReceipt>,
    pub processing_steps: Vec<ProcessingStep>,
    pub quality_tests: Vec<QualityTest>,
    pub created_at: Timestamp,
    pub processing_started_at: Option<Timestamp>,
    pub processing_completed_at: Option<Timestamp>,
    pub testing_started_at: Option<Timestamp>,
    pub tested_at: Option<Timestamp>,
    pub rejected_at: Option<Timestamp>,
    pub rejection_reason: Option<String>,
    /// Incremented on every committed mutation.
    pub version: u64,
}

impl Batch {
    /// Create a new `pending` batch.
    pub fn new(
        batch_id: BatchId,
        attributes: BatchAttributes,
        farmer_id: ActorId,
        created_at: Timestamp,
    ) -> Self {
        Self {
            batch_id,
            attributes,
            status: BatchStatus::Pending,
            farmer_id,
            processor_id: None,
            lab_id: None,
            ledger_state: LedgerState::default(),
            ledger_facts: Vec::new(),
            processing_steps: Vec::new(),
            quality_tests: Vec::new(),
            created_at,
            processing_started_at: None,
            processing_completed_at: None,
            testing_started_at: None,
            tested_at: None,
            rejected_at: None,
            rejection_reason: None,
            version: 0,
        }
    }

    /// The actor holding the role's assignment slot, if the role has one.
    pub fn assignee(&self, role: Role) -> Option<&ActorId> {
        match role {
            Role::Collector => Some(&self.farmer_id),
            Role::Processor => self.processor_id.as_ref(),
            Role::Laboratory => self.lab_id.as_ref(),
            Role::Manufacturer | Role::Verifier | Role::System => None,
        }
    }

    pub fn fact(&self, fact_type: FactType) -> Option<&FactReceipt> {
        self.ledger_facts.iter().find(|f| f.fact_type == fact_type)
    }

    /// Enqueue a fact for mirroring. Returns `false` when the fact already
    /// has an attempt chain.
    pub fn enqueue_fact(&mut self, fact_type: FactType) -> bool {
        if self.fact(fact_type).is_some() {
            return false;
        }
        self.ledger_facts.push(FactReceipt::pending(fact_type));
        self.ledger_state = LedgerState::default();
        true
    }

    /// Apply a mirror outcome to a fact receipt.
    ///
    /// `ledger_state` follows the receipt only when it is the most recently
    /// enqueued fact. When the fact confirms, the record that produced it
    /// receives the transaction reference. Returns `false` for an unknown fact.
    pub fn apply_fact_state(
        &mut self,
        fact_type: FactType,
        status: MirrorStatus,
        state: LedgerState,
    ) -> bool {
        let Some(index) = self
            .ledger_facts
            .iter()
            .position(|f| f.fact_type == fact_type)
        else {
            return false;
        };

        if state.recorded {
            if let Some(tx) = state.transaction_ref.clone() {
                self.link_record(fact_type, tx);
            }
        }

        if index + 1 == self.ledger_facts.len() {
            self.ledger_state = state.clone();
        }
        let receipt = &mut self.ledger_facts[index];
        receipt.status = status;
        receipt.state = state;
        true
    }

    fn link_record(&mut self, fact_type: FactType, tx: String) {
        match fact_type {
            FactType::Processing => {
                if let Some(step) = self.processing_steps.last_mut() {
                    step.ledger_ref.get_or_insert(tx);
                }
            }
            FactType::Completion => {
                if let Some(test) = self
                    .quality_tests
                    .last_mut()
                    .filter(|t| t.overall_result.is_pass())
                {
                    test.ledger_ref.get_or_insert(tx);
                }
            }
            FactType::Rejection => {
                if let Some(test) = self
                    .quality_tests
                    .last_mut()
                    .filter(|t| !t.overall_result.is_pass())
                {
                    test.ledger_ref.get_or_insert(tx);
                }
            }
            FactType::Collection => {}
        }
    }

    /// Facts confirmed on the ledger.
    pub fn recorded_facts(&self) -> impl Iterator<Item = &FactReceipt> {
        self.ledger_facts.iter().filter(|f| f.state.recorded)
    }

    /// Integrity invariant over `ledger_state` and every receipt.
    pub fn ledger_consistent(&self) -> bool {
        self.ledger_state.is_consistent()
            && self.ledger_facts.iter().all(|f| f.state.is_consistent())
    }
}

// =============================================================================
// CLUSTER C: RECORDS
// =============================================================================

/// Processing report filed by the assigned processor. Immutable once
/// appended; `ledger_ref` is filled once when its fact confirms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingStep {
    pub batch_id: BatchId,
    /// 1-based, per batch.
    pub sequence: u32,
    pub processor_id: ActorId,
    pub process_type: String,
    pub input_quantity: f64,
    pub output_quantity: f64,
    pub temperature_c: Option<f64>,
    pub duration_minutes: Option<u32>,
    pub notes: String,
    pub recorded_at: Timestamp,
    pub ledger_ref: Option<String>,
}

/// Overall lab verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestOutcome {
    Pass,
    Fail,
}

impl TestOutcome {
    pub fn is_pass(&self) -> bool {
        matches!(self, TestOutcome::Pass)
    }
}

/// Quality test filed by the assigned laboratory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityTest {
    pub batch_id: BatchId,
    pub sequence: u32,
    pub lab_id: ActorId,
    /// Percent.
    pub moisture_content: f64,
    /// Percent.
    pub purity: f64,
    /// Parts per million.
    pub pesticide_level: f64,
    pub overall_result: TestOutcome,
    pub notes: String,
    pub tested_at: Timestamp,
    pub ledger_ref: Option<String>,
}

// =============================================================================
// CLUSTER D: LEDGER MIRROR
// =============================================================================

/// Logical fact mirrored onto the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactType {
    Collection,
    Processing,
    Completion,
    Rejection,
}

impl FactType {
    pub const ALL: [FactType; 4] = [
        FactType::Collection,
        FactType::Processing,
        FactType::Completion,
        FactType::Rejection,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FactType::Collection => "collection",
            FactType::Processing => "processing",
            FactType::Completion => "completion",
            FactType::Rejection => "rejection",
        }
    }
}

impl fmt::Display for FactType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FactType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FactType::ALL
            .into_iter()
            .find(|fact| fact.as_str() == s)
            .ok_or_else(|| ParseError::UnknownFactType(s.to_string()))
    }
}

/// Local view of one fact's ledger mirror.
///
/// Build recorded states through `confirmed` so the transaction reference
/// is always present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerState {
    pub recorded: bool,
    pub transaction_ref: Option<String>,
    /// Block height the transaction was mined in.
    pub block_ref: Option<u64>,
    pub object_hash: Option<String>,
    /// Failed attempts so far.
    pub attempts: u32,
    pub last_error: Option<String>,
}

impl LedgerState {
    /// A confirmed state. `attempts` and `last_error` carry over from the
    /// chain that produced it.
    pub fn confirmed(
        &self,
        transaction_ref: impl Into<String>,
        block_ref: u64,
        object_hash: impl Into<String>,
    ) -> Self {
        Self {
            recorded: true,
            transaction_ref: Some(transaction_ref.into()),
            block_ref: Some(block_ref),
            object_hash: Some(object_hash.into()),
            attempts: self.attempts,
            last_error: self.last_error.clone(),
        }
    }

    /// The state after one more failed attempt.
    pub fn with_failed_attempt(&self, error: impl Into<String>) -> Self {
        Self {
            recorded: false,
            transaction_ref: None,
            block_ref: None,
            object_hash: self.object_hash.clone(),
            attempts: self.attempts.saturating_add(1),
            last_error: Some(error.into()),
        }
    }

    /// `recorded` implies a transaction reference.
    pub fn is_consistent(&self) -> bool {
        !self.recorded || self.transaction_ref.is_some()
    }
}

/// Where a fact's attempt chain stands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MirrorStatus {
    /// Enqueued or retrying.
    #[default]
    Pending,
    Confirmed,
    /// Exhausted or permanently rejected. Never retried.
    Failed,
}

/// Per-fact mirror record on the batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactReceipt {
    pub fact_type: FactType,
    pub status: MirrorStatus,
    pub state: LedgerState,
}

impl FactReceipt {
    pub fn pending(fact_type: FactType) -> Self {
        Self {
            fact_type,
            status: MirrorStatus::Pending,
            state: LedgerState::default(),
        }
    }
}
