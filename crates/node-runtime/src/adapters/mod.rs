//! # Adapter Implementations
//!
//! Bridges between the two subsystems. Each adapter implements one
//! subsystem's outbound port on top of the other subsystem's inbound port,
//! so neither crate depends on the other.
//!
//! ```text
//! ┌──────────────────────┐   LedgerMirror    ┌──────────────────────┐
//! │ hc-01 BatchWorkflow  │ ────────────────▶ │ hc-02 LedgerRecorder │
//! │                      │  (RecorderMirror) │                      │
//! │   LedgerStateApi     │ ◀──────────────── │   LedgerStateStore   │
//! └──────────────────────┘ (WorkflowStateStore)└────────────────────┘
//! ```

pub mod metered_workflow;
pub mod mirror;
pub mod state_store;

pub use metered_workflow::MeteredWorkflow;
pub use mirror::RecorderMirror;
pub use state_store::WorkflowStateStore;
