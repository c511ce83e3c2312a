//! Soft-fail notification helper.

use shared_bus::{BatchEvent, EventPublisher};
use tracing::{debug, warn};

/// Publish without ever failing the caller.
pub(crate) async fn publish(publisher: &dyn EventPublisher, event: BatchEvent) {
    let name = event.name();
    let batch_id = event.batch_id().clone();
    match publisher.publish(event).await {
        Ok(receivers) => debug!(event = name, batch_id = %batch_id, receivers, "[hc-01] Notified"),
        Err(err) => warn!(
            event = name,
            batch_id = %batch_id,
            error = %err,
            "[hc-01] Notification not delivered"
        ),
    }
}
