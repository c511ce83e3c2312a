//! # Domain Module
//!
//! Core domain logic for the batch workflow.

pub mod errors;
pub mod identity;
pub mod invariants;
pub mod pool;
pub mod state_machine;
pub mod value_objects;

pub use errors::*;
pub use identity::{BatchIdentity, RandomSuffix, SuffixSource, CROCKFORD_ALPHABET};
pub use pool::Transition;
pub use state_machine::{Action, Evidence, Standing, TransitionRule, TRANSITIONS};
pub use value_objects::*;
