//! # Audit Handler
//!
//! Follows every bus notification: logs it, keeps a bounded in-memory
//! trail, and feeds the Prometheus counters.

use herb_telemetry::{
    BATCHES_CREATED, CLAIMS, EVENTS_OBSERVED, LEDGER_FACTS, STATUS_TRANSITIONS,
    VERIFICATION_MISMATCHES,
};
use parking_lot::Mutex;
use shared_bus::{BatchEvent, EventFilter, InMemoryEventBus, Subscription};
use shared_types::BatchId;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

/// Default number of events the trail keeps.
pub const DEFAULT_TRAIL_CAPACITY: usize = 10_000;

/// Most recent notifications, oldest first.
#[derive(Clone)]
pub struct AuditTrail {
    events: Arc<Mutex<VecDeque<BatchEvent>>>,
    capacity: usize,
}

impl AuditTrail {
    pub fn new(capacity: usize) -> Self {
        Self {
            events: Arc::new(Mutex::new(VecDeque::with_capacity(capacity.min(1024)))),
            capacity: capacity.max(1),
        }
    }

    pub fn record(&self, event: BatchEvent) {
        let mut events = self.events.lock();
        if events.len() == self.capacity {
            events.pop_front();
        }
        events.push_back(event);
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    pub fn events(&self) -> Vec<BatchEvent> {
        self.events.lock().iter().cloned().collect()
    }

    /// Notification names for one batch, in publish order.
    pub fn names_for(&self, batch_id: &BatchId) -> Vec<&'static str> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.batch_id() == batch_id)
            .map(BatchEvent::name)
            .collect()
    }
}

impl Default for AuditTrail {
    fn default() -> Self {
        Self::new(DEFAULT_TRAIL_CAPACITY)
    }
}

/// Update the counters for one notification.
pub fn observe(event: &BatchEvent) {
    let source = event.source_subsystem().to_string();
    EVENTS_OBSERVED
        .with_label_values(&[event.name(), source.as_str()])
        .inc();

    match event {
        BatchEvent::Created { .. } => BATCHES_CREATED.inc(),
        BatchEvent::Claimed { role, .. } => CLAIMS.with_label_values(&[role.as_str()]).inc(),
        BatchEvent::StatusChanged { to, .. } => {
            STATUS_TRANSITIONS.with_label_values(&[to.as_str()]).inc()
        }
        BatchEvent::LedgerRecorded { fact_type, .. } => LEDGER_FACTS
            .with_label_values(&[fact_type.as_str(), "recorded"])
            .inc(),
        BatchEvent::LedgerFailed { fact_type, .. } => LEDGER_FACTS
            .with_label_values(&[fact_type.as_str(), "failed"])
            .inc(),
        BatchEvent::VerificationMismatch { .. } => VERIFICATION_MISMATCHES.inc(),
    }
}

/// Handler for every bus notification.
pub struct AuditHandler {
    subscription: Subscription,
    trail: AuditTrail,
}

impl AuditHandler {
    /// Subscribes immediately, so nothing published after `new` returns is missed.
    pub fn new(bus: &InMemoryEventBus, trail: AuditTrail) -> Self {
        Self {
            subscription: bus.subscribe(EventFilter::all()),
            trail,
        }
    }

    /// Run the handler loop until the bus closes or `shutdown` fires.
    ///
    /// On shutdown, events already queued on the subscription are still
    /// handled.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!("Audit handler started");
        loop {
            let event = tokio::select! {
                event = self.subscription.recv() => event,
                _ = shutdown.changed() => break,
            };
            match event {
                Some(event) => self.handle(event),
                None => {
                    info!("Audit handler stopped: event bus closed");
                    return;
                }
            }
        }

        while let Ok(Some(event)) = self.subscription.try_recv() {
            self.handle(event);
        }
        info!("[audit] Shutdown signal received");
    }

    fn handle(&self, event: BatchEvent) {
        observe(&event);
        match &event {
            BatchEvent::LedgerFailed {
                batch_id,
                fact_type,
                attempts,
                last_error,
            } => warn!(
                event = event.name(),
                batch_id = %batch_id,
                fact = %fact_type,
                attempts,
                last_error = %last_error,
                "[audit] Ledger chain failed"
            ),
            BatchEvent::VerificationMismatch { batch_id, details } => warn!(
                event = event.name(),
                batch_id = %batch_id,
                details = ?details,
                "[audit] Ledger disagrees with local record"
            ),
            other => info!(
                event = other.name(),
                batch_id = %other.batch_id(),
                "[audit] {}",
                other.name()
            ),
        }
        self.trail.record(event);
    }
}
