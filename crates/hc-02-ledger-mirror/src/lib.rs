//! # HC-02 Ledger Mirror
//!
//! Keeps the authoritative local record eventually consistent with an
//! unreliable, latency-heavy external ledger.
//!
//! **Subsystem ID:** 2
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! - Serialize a fact's snapshot into the content-addressed store
//! - Submit a recording transaction with bounded, jittered retries
//! - Persist each fact's outcome (confirmed / pending / failed) on its receipt
//! - Compare the ledger with the local record on demand
//!
//! ## Guarantees
//!
//! | Guarantee | Mechanism |
//! |-----------|-----------|
//! | One chain per fact | Receipt status + in-flight set in `LedgerRecorder` |
//! | No duplicate transactions | Ledger query before every retry adopts lost acks |
//! | Workflow never blocked | Recorder runs in spawned tasks after commit |
//! | Mismatches surfaced, not fixed | `VerificationReconciler` only reports |
//!
//! ## Module Structure
//!
//! ```text
//! hc-02-ledger-mirror/
//! ├── domain/          # RetryPolicy, LedgerFact, RecordOutcome, reconcile
//! ├── ports/           # FactRecorderApi, VerificationApi, Ledger, ContentAddressStore, LedgerStateStore
//! ├── adapters/        # In-memory ledger/store, UnconfiguredLedger
//! ├── recorder.rs      # LedgerRecorder
//! └── reconciler.rs    # VerificationReconciler
//! ```

#![warn(clippy::all)]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod reconciler;
pub mod recorder;

mod notify;

// Re-exports
pub use adapters::{
    content_hash, InMemoryContentStore, InMemoryLedger, InMemoryLedgerStateStore,
    UnconfiguredLedger,
};
pub use domain::{
    LedgerError, LedgerFact, LedgerReceipt, LedgerResult, RecordOutcome, RetryPolicy,
    VerificationResult, VerificationStatus,
};
pub use ports::{ContentAddressStore, FactRecorderApi, Ledger, LedgerStateStore, VerificationApi};
pub use reconciler::VerificationReconciler;
pub use recorder::{LedgerRecorder, RecorderConfig, DEFAULT_ATTEMPT_TIMEOUT};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
