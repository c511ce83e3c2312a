//! # Adapters Layer (Hexagonal Architecture)
//!
//! Implements outbound port traits for the batch workflow.

mod memory_repository;

pub use memory_repository::InMemoryBatchRepository;
