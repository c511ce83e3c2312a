//! # Shared Types Crate
//!
//! This crate contains the batch aggregate and every value type that crosses
//! a subsystem boundary (workflow, ledger mirror, event bus, runtime).
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All cross-subsystem types are defined here.
//! - **Authoritative Local Record**: `Batch` is the only mutable shared
//!   resource; the ledger is a mirror of it, never the other way around.
//! - **Integrity Invariant**: a `LedgerState` with `recorded == true` always
//!   carries a transaction reference. Constructors enforce it.

pub mod entities;
pub mod errors;

pub use entities::*;
pub use errors::*;
