//! # Shared Bus - Domain Event Bus
//!
//! Carries batch notifications (`batch.created`, `batch.claimed`, ...) from
//! the workflow and ledger mirror subsystems to whoever listens: the node's
//! audit log, metrics, a push-notification bridge.
//!
//! ```text
//! ┌──────────────┐                    ┌──────────────┐
//! │ hc-01 / 02   │                    │  Audit log,  │
//! │              │    publish()       │  metrics     │
//! │              │ ──────┐            │              │
//! └──────────────┘       │            └──────────────┘
//!                        ▼                    ↑
//!                  ┌──────────────┐          │
//!                  │  Event Bus   │          │
//!                  │              │ ─────────┘
//!                  └──────────────┘  subscribe()
//! ```
//!
//! ## Lifecycle
//!
//! The publisher is injected, never global. It must be `connect`ed before
//! publishing; publishing while disconnected returns
//! `PublishError::NotConnected`, which callers log and otherwise ignore.
//! Notifications never fail a workflow operation.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod events;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use events::{BatchEvent, EventFilter, EventTopic};
pub use publisher::{EventPublisher, InMemoryEventBus, PublishError};
pub use subscriber::{EventStream, Subscription, SubscriptionError};

/// Maximum events to buffer per subscriber before lagging.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_capacity() {
        assert_eq!(DEFAULT_CHANNEL_CAPACITY, 1000);
    }
}
