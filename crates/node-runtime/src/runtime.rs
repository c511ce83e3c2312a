//! # Node Runtime
//!
//! Owns the container and the handler tasks, and runs the startup and
//! graceful shutdown sequences.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use shared_bus::EventPublisher;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::container::{NodeConfig, SubsystemContainer};
use crate::handlers::{AuditHandler, AuditTrail, VerificationSweep};

/// How long shutdown waits for running ledger chains, then for handlers.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// The node runtime.
pub struct NodeRuntime {
    container: Arc<SubsystemContainer>,
    trail: AuditTrail,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl NodeRuntime {
    /// Create a new node runtime with the given configuration.
    pub fn new(config: NodeConfig) -> Self {
        Self::with_container(SubsystemContainer::new(config))
    }

    pub fn with_container(container: SubsystemContainer) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            container: Arc::new(container),
            trail: AuditTrail::default(),
            shutdown_tx,
            shutdown_rx,
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn container(&self) -> &Arc<SubsystemContainer> {
        &self.container
    }

    pub fn audit_trail(&self) -> &AuditTrail {
        &self.trail
    }

    /// Connect the bus and start the handlers.
    pub fn start(&self) {
        info!("Starting Herb-Chain node runtime");
        self.container.event_bus.connect();

        let audit = AuditHandler::new(&self.container.event_bus, self.trail.clone());
        let audit_task = tokio::spawn(audit.run(self.shutdown_rx.clone()));
        self.tasks.lock().push(audit_task);

        match self.container.config.verification.sweep_interval() {
            Some(interval) => {
                let sweep = VerificationSweep::new(Arc::clone(&self.container), interval);
                let mut sweep_shutdown = self.shutdown_rx.clone();
                let sweep_task = tokio::spawn(async move {
                    tokio::select! {
                        _ = sweep.run() => {}
                        _ = sweep_shutdown.changed() => {
                            info!("[hc-02] Shutdown signal received");
                        }
                    }
                });
                self.tasks.lock().push(sweep_task);
            }
            None => info!("Verification sweep disabled"),
        }

        let redispatched = self.container.mirror.redispatch();
        if redispatched > 0 {
            info!(redispatched, "[hc-02] Started chains for stranded facts");
        }

        info!("Node runtime started");
    }

    /// Shutdown the node gracefully.
    ///
    /// Running ledger chains get a grace period to finish, so their outcomes
    /// are stored and announced before the handlers stop and the bus
    /// disconnects.
    pub async fn shutdown(&self) {
        info!("Initiating graceful shutdown...");

        match tokio::time::timeout(SHUTDOWN_GRACE, self.container.mirror.settle()).await {
            Ok(settled) => info!(settled, "Ledger chains settled"),
            Err(_) => warn!(
                running = self.container.mirror.running(),
                "Ledger chains still running at shutdown; their facts stay pending"
            ),
        }

        if let Err(e) = self.shutdown_tx.send(true) {
            error!("Failed to send shutdown signal: {}", e);
        }

        let tasks = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            if tokio::time::timeout(SHUTDOWN_GRACE, task).await.is_err() {
                warn!("Handler did not stop within the grace period");
            }
        }

        self.container.event_bus.disconnect();
        info!("Shutdown complete");
    }
}
