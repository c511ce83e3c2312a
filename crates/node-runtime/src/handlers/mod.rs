//! # Event Handlers
//!
//! Long-running tasks the runtime spawns next to the subsystems.

pub mod audit;
pub mod verification_sweep;

pub use audit::{AuditHandler, AuditTrail};
pub use verification_sweep::{SweepSummary, VerificationSweep};
