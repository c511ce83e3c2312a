//! # Herb-Chain Node
//!
//! The main entry point for the herb batch tracking node.
//!
//! ## Startup Sequence
//!
//! 1. Initialize telemetry (logging, metrics) from `HC_*` variables
//! 2. Load configuration: defaults, then `HC_CONFIG` (TOML), then `HC_*` overrides
//! 3. Validate configuration
//! 4. Initialize subsystems in dependency order
//! 5. Connect the event bus and start handlers
//! 6. Wait for Ctrl-C, then shut down gracefully

use anyhow::{Context, Result};
use tracing::info;

use herb_telemetry::{init_telemetry, TelemetryConfig};
use node_runtime::{NodeConfig, NodeRuntime};

fn load_config() -> Result<NodeConfig> {
    let config = match std::env::var("HC_CONFIG") {
        Ok(path) => {
            let mut config = NodeConfig::load(&path)
                .with_context(|| format!("failed to load configuration from {path}"))?;
            config
                .apply_overrides(|name| std::env::var(name).ok())
                .context("invalid HC_* environment override")?;
            config
        }
        Err(_) => NodeConfig::from_env().context("invalid HC_* environment override")?,
    };
    config.validate().context("configuration rejected")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let _telemetry =
        init_telemetry(TelemetryConfig::from_env()).context("failed to initialize telemetry")?;

    let config = load_config()?;
    info!(
        ledger_mode = ?config.ledger.mode,
        max_attempts = config.ledger.max_attempts,
        sweep_secs = config.verification.sweep_interval_secs,
        "Configuration loaded"
    );

    let runtime = NodeRuntime::new(config);
    runtime.start();

    info!("Herb-Chain node running; press Ctrl-C to stop");
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;

    runtime.shutdown().await;
    Ok(())
}
