//! # HC-01 Batch Workflow
//!
//! Owns batch identity and the canonical batch status across independently
//! acting role actors.
//!
//! **Subsystem ID:** 1
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! - Generate collision-resistant, human-readable batch ids
//! - Validate every transition against one declarative table
//! - Serialize concurrent claims so a batch is never double-assigned
//! - Enqueue ledger facts for the mirror without ever waiting on it
//!
//! ## Guarantees
//!
//! | Guarantee | Mechanism |
//! |-----------|-----------|
//! | No skipped states | `state_machine::TRANSITIONS` is the only path to a status change |
//! | Single assignment | Claims run as compare-and-swap inside `BatchRepository::update` |
//! | Append-only records | Checked by `invariants::check_commit` before every commit |
//! | Non-blocking mirror | Facts are handed to `LedgerMirror` after commit |
//!
//! ## Module Structure
//!
//! ```text
//! hc-01-batch-workflow/
//! ├── domain/          # State machine, identity, pool rules, invariants
//! ├── ports/           # BatchWorkflowApi, LedgerStateApi, BatchRepository, LedgerMirror
//! ├── adapters/        # In-memory repository
//! ├── service.rs       # BatchWorkflowService
//! └── ledger_sync.rs   # Applies ledger outcomes back onto batches
//! ```

#![warn(clippy::all)]

pub mod adapters;
pub mod domain;
pub mod ledger_sync;
pub mod ports;
pub mod service;

mod notify;

// Re-exports
pub use adapters::InMemoryBatchRepository;
pub use domain::{
    BatchIdentity, CompletionReport, ProcessingReport, RandomSuffix, SuffixSource, TestReport,
    WorkflowConfig, WorkflowError, WorkflowResult,
};
pub use ledger_sync::LedgerSync;
pub use ports::{
    BatchRepository, BatchWorkflowApi, FactRequest, LedgerMirror, LedgerStateApi,
    SystemTimeSource, TimeSource,
};
pub use service::BatchWorkflowService;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
