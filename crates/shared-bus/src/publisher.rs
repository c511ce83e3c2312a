//! # Event Publisher
//!
//! Defines the publishing side of the event bus.

use crate::events::{BatchEvent, EventFilter};
use crate::subscriber::{EventStream, Subscription, SubscriptionTracker};
use crate::DEFAULT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Errors from publishing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PublishError {
    /// `connect` has not been called, or `disconnect` was.
    #[error("Event publisher not connected")]
    NotConnected,

    /// The underlying transport is gone.
    #[error("Event publisher closed")]
    Closed,
}

/// Trait for publishing events to the bus.
///
/// Injected into every subsystem that notifies. Implementations must be
/// cheap to call from inside request paths; delivery failures are reported
/// through `PublishError` and never retried here.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish an event to the bus.
    ///
    /// # Returns
    ///
    /// The number of active subscribers that received the event.
    async fn publish(&self, event: BatchEvent) -> Result<usize, PublishError>;

    /// Open the publisher for delivery.
    fn connect(&self);

    /// Stop delivery. Subsequent publishes fail with `NotConnected`.
    fn disconnect(&self);

    fn is_connected(&self) -> bool;

    /// Get the total number of events delivered.
    fn events_published(&self) -> u64;
}

/// In-memory implementation of the event bus.
///
/// Uses `tokio::sync::broadcast` for multi-producer, multi-consumer semantics.
/// A push-notification transport would implement `EventPublisher` directly.
pub struct InMemoryEventBus {
    /// Broadcast sender for events.
    sender: broadcast::Sender<BatchEvent>,

    /// Active subscription count by topic.
    tracker: SubscriptionTracker,

    connected: AtomicBool,

    /// Total events delivered.
    events_published: AtomicU64,

    /// Channel capacity.
    capacity: usize,
}

impl InMemoryEventBus {
    /// Create a new, disconnected event bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new, disconnected event bus with specified capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            tracker: SubscriptionTracker::default(),
            connected: AtomicBool::new(false),
            events_published: AtomicU64::new(0),
            capacity,
        }
    }

    /// Create a bus that is already connected.
    #[must_use]
    pub fn connected(capacity: usize) -> Self {
        let bus = Self::with_capacity(capacity);
        bus.connect();
        bus
    }

    /// Subscribe to events matching a filter.
    ///
    /// Subscribing does not require a connection; events flow once the
    /// publisher connects.
    #[must_use]
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        let receiver = self.sender.subscribe();
        let guard = self.tracker.track(&filter);

        debug!(topics = ?filter.topics, "New subscription created");

        Subscription::new(receiver, filter, guard)
    }

    /// Get a stream of events matching a filter.
    #[must_use]
    pub fn event_stream(&self, filter: EventFilter) -> EventStream {
        EventStream::new(self.subscribe(filter))
    }

    /// Get the number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Active subscriptions keyed by filter topics.
    #[must_use]
    pub fn subscriptions_for(&self, filter: &EventFilter) -> usize {
        self.tracker.count(filter)
    }

    /// Get the channel capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: BatchEvent) -> Result<usize, PublishError> {
        if !self.is_connected() {
            return Err(PublishError::NotConnected);
        }

        let name = event.name();
        let batch_id = event.batch_id().clone();
        self.events_published.fetch_add(1, Ordering::Relaxed);

        match self.sender.send(event) {
            Ok(receiver_count) => {
                debug!(
                    event = name,
                    batch_id = %batch_id,
                    receivers = receiver_count,
                    "Event published"
                );
                Ok(receiver_count)
            }
            Err(_) => {
                // Nobody listening is not a delivery failure.
                debug!(event = name, batch_id = %batch_id, "Event had no receivers");
                Ok(0)
            }
        }
    }

    fn connect(&self) {
        if !self.connected.swap(true, Ordering::SeqCst) {
            info!("Event bus connected");
        }
    }

    fn disconnect(&self) {
        if self.connected.swap(false, Ordering::SeqCst) {
            warn!(
                published = self.events_published.load(Ordering::Relaxed),
                "Event bus disconnected"
            );
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }
}
