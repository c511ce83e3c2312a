//! # Node Runtime Library
//!
//! This library exposes the internal modules of the node runtime for testing.
//! The main entry point is the `herb-node` binary.
//!
//! ## Architectural Patterns
//!
//! - **EDA (Event-Driven Architecture)**: notifications travel over the shared bus only
//! - **DDD (Domain-Driven Design)**: each subsystem owns its domain logic
//! - **Hexagonal Architecture**: ports define contracts, adapters in this crate bridge them

#![allow(clippy::type_complexity)]

pub mod adapters;
pub mod container;
pub mod handlers;
pub mod runtime;

pub use container::{ConfigError, LedgerMode, NodeConfig, SubsystemContainer};
pub use runtime::NodeRuntime;
