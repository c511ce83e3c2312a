//! # Adapters Layer (Hexagonal Architecture)
//!
//! In-memory implementations of the ledger mirror's outbound ports.

mod content_store;
mod memory_ledger;
mod state_store;

pub use content_store::{content_hash, InMemoryContentStore};
pub use memory_ledger::{InMemoryLedger, UnconfiguredLedger};
pub use state_store::InMemoryLedgerStateStore;
