//! Prometheus metrics for Herb-Chain subsystems.
//!
//! All metrics follow the naming convention: `hc_<subsystem>_<metric>_<unit>`

use lazy_static::lazy_static;
use prometheus::{Counter, CounterVec, Encoder, Opts, Registry, TextEncoder};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // BATCH WORKFLOW METRICS (Subsystem 1)
    // =========================================================================

    /// Batches registered by collectors
    pub static ref BATCHES_CREATED: Counter = Counter::new(
        "hc_workflow_batches_created_total",
        "Total number of batches created"
    ).expect("metric creation failed");

    /// Successful claims
    pub static ref CLAIMS: CounterVec = CounterVec::new(
        Opts::new("hc_workflow_claims_total", "Successful claims"),
        &["role"]  // role: processor/laboratory
    ).expect("metric creation failed");

    /// Claims that lost a race
    pub static ref CLAIM_CONFLICTS: Counter = Counter::new(
        "hc_workflow_claim_conflicts_total",
        "Claims rejected because another actor holds the slot"
    ).expect("metric creation failed");

    /// Committed status transitions
    pub static ref STATUS_TRANSITIONS: CounterVec = CounterVec::new(
        Opts::new("hc_workflow_status_transitions_total", "Committed status transitions"),
        &["to"]
    ).expect("metric creation failed");

    // =========================================================================
    // LEDGER MIRROR METRICS (Subsystem 2)
    // =========================================================================

    /// Fact chains that ended
    pub static ref LEDGER_FACTS: CounterVec = CounterVec::new(
        Opts::new("hc_ledger_facts_total", "Ledger fact chains by outcome"),
        &["fact_type", "outcome"]  // outcome: recorded/failed
    ).expect("metric creation failed");

    /// Verification runs
    pub static ref VERIFICATIONS: CounterVec = CounterVec::new(
        Opts::new("hc_ledger_verifications_total", "Verification runs by status"),
        &["status"]
    ).expect("metric creation failed");

    /// Ledger disagreements with the local record
    pub static ref VERIFICATION_MISMATCHES: Counter = Counter::new(
        "hc_ledger_verification_mismatches_total",
        "Verifications that found the ledger disagreeing with the local record"
    ).expect("metric creation failed");

    // =========================================================================
    // EVENT BUS METRICS
    // =========================================================================

    /// Events observed by the node's audit handler
    pub static ref EVENTS_OBSERVED: CounterVec = CounterVec::new(
        Opts::new("hc_eventbus_events_observed_total", "Events observed on the bus"),
        &["event", "source_subsystem"]
    ).expect("metric creation failed");
}

/// Register all metrics with the global registry. Safe to call twice.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Workflow
        Box::new(BATCHES_CREATED.clone()),
        Box::new(CLAIMS.clone()),
        Box::new(CLAIM_CONFLICTS.clone()),
        Box::new(STATUS_TRANSITIONS.clone()),
        // Ledger
        Box::new(LEDGER_FACTS.clone()),
        Box::new(VERIFICATIONS.clone()),
        Box::new(VERIFICATION_MISMATCHES.clone()),
        // Event Bus
        Box::new(EVENTS_OBSERVED.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }
    Ok(())
}

/// Encode all metrics as Prometheus text format.
pub fn gather_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}
