//! Soft-fail notification helper.

use shared_bus::{BatchEvent, EventPublisher};
use tracing::{debug, warn};

pub(crate) async fn publish(publisher: &dyn EventPublisher, event: BatchEvent) {
    let name = event.name();
    let batch_id = event.batch_id().clone();
    if let Err(err) = publisher.publish(event).await {
        warn!(
            event = name,
            batch_id = %batch_id,
            error = %err,
            "[hc-02] Notification not delivered"
        );
    } else {
        debug!(event = name, batch_id = %batch_id, "[hc-02] Notified");
    }
}
