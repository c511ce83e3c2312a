//! # Subsystem Container
//!
//! Central container holding both subsystem instances with proper lifetime
//! management and dependency injection.
//!
//! - Subsystems initialized in dependency order (bus, workflow, mirror)
//! - Cross-subsystem calls go through bridge adapters implementing ports
//! - Notifications flow over the injected event bus

pub mod config;
pub mod subsystems;

pub use config::{
    ConfigError, EventBusSection, LedgerMode, LedgerSection, NodeConfig, VerificationSection,
    WorkflowSection,
};
pub use subsystems::{ConcreteLedgerSync, ConcreteWorkflowService, SubsystemContainer};
