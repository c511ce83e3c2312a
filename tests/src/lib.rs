//! # Herb-Chain Test Suite
//!
//! Cross-subsystem scenarios run against the node container, with both
//! subsystems wired the way `herb-node` wires them.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── fixtures.rs          # Container builders, drafts, reports
//!     ├── supply_chain.rs      # Collector to lab, end to end
//!     ├── ledger_outages.rs    # Unreachable / flaky ledger
//!     ├── idempotency.rs       # Lost acks, repeated records
//!     └── verification.rs      # verify before, after and against a tampered ledger
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p herb-tests
//! cargo test -p herb-tests integration::supply_chain
//! ```

#![allow(dead_code)]

pub mod integration;
