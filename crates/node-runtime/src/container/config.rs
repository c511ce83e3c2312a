//! # Node Configuration
//!
//! Unified configuration for both subsystems and the runtime.
//!
//! Sources, lowest precedence first: built-in defaults, an optional TOML
//! file (`HC_CONFIG`), then `HC_*` environment variables. Every value has a
//! default; `validate()` runs once before the container is built.

use hc_01_batch_workflow::WorkflowConfig;
use hc_02_ledger_mirror::{RecorderConfig, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Complete node configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Batch workflow configuration.
    pub workflow: WorkflowSection,
    /// Ledger mirror configuration.
    pub ledger: LedgerSection,
    /// Periodic verification configuration.
    pub verification: VerificationSection,
    /// Event bus configuration.
    pub event_bus: EventBusSection,
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A value is out of range or unparsable.
    #[error("Invalid configuration value for {field}: {reason}")]
    Invalid { field: String, reason: String },

    /// The config file could not be read.
    #[error("Cannot read config file {path}: {reason}")]
    Io { path: PathBuf, reason: String },

    /// The config file is not valid TOML for `NodeConfig`.
    #[error("Invalid TOML configuration: {0}")]
    Toml(String),
}

impl ConfigError {
    fn invalid(field: &str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

impl NodeConfig {
    /// Defaults overlaid with `HC_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Parse a TOML document. Missing sections and fields keep their defaults.
    pub fn from_toml_str(document: &str) -> Result<Self, ConfigError> {
        toml::from_str(document).map_err(|e| ConfigError::Toml(e.to_string()))
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let document = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&document)
    }

    /// Overlay values from `lookup` (normally the process environment).
    ///
    /// # Variables
    ///
    /// - `HC_ID_MAX_ATTEMPTS`, `HC_ID_SUFFIX_LEN`
    /// - `HC_LEDGER_MODE` (`memory` | `disabled`)
    /// - `HC_LEDGER_MAX_ATTEMPTS`, `HC_LEDGER_BASE_DELAY_MS`, `HC_LEDGER_MULTIPLIER`,
    ///   `HC_LEDGER_MAX_DELAY_MS`, `HC_LEDGER_JITTER`, `HC_LEDGER_ATTEMPT_TIMEOUT_MS`
    /// - `HC_VERIFY_SWEEP_SECS` (0 disables the sweep), `HC_VERIFY_TIMEOUT_MS`
    /// - `HC_EVENT_BUS_CAPACITY`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        override_parsed(&var, "HC_ID_MAX_ATTEMPTS", &mut self.workflow.id_max_attempts)?;
        override_parsed(&var, "HC_ID_SUFFIX_LEN", &mut self.workflow.id_suffix_len)?;

        override_parsed(&var, "HC_LEDGER_MODE", &mut self.ledger.mode)?;
        override_parsed(&var, "HC_LEDGER_MAX_ATTEMPTS", &mut self.ledger.max_attempts)?;
        override_parsed(&var, "HC_LEDGER_BASE_DELAY_MS", &mut self.ledger.base_delay_ms)?;
        override_parsed(&var, "HC_LEDGER_MULTIPLIER", &mut self.ledger.multiplier)?;
        override_parsed(&var, "HC_LEDGER_MAX_DELAY_MS", &mut self.ledger.max_delay_ms)?;
        override_parsed(&var, "HC_LEDGER_JITTER", &mut self.ledger.jitter)?;
        override_parsed(
            &var,
            "HC_LEDGER_ATTEMPT_TIMEOUT_MS",
            &mut self.ledger.attempt_timeout_ms,
        )?;

        override_parsed(
            &var,
            "HC_VERIFY_SWEEP_SECS",
            &mut self.verification.sweep_interval_secs,
        )?;
        override_parsed(
            &var,
            "HC_VERIFY_TIMEOUT_MS",
            &mut self.verification.query_timeout_ms,
        )?;

        override_parsed(&var, "HC_EVENT_BUS_CAPACITY", &mut self.event_bus.channel_capacity)?;
        Ok(())
    }

    /// Reject values the subsystems cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workflow.id_max_attempts == 0 {
            return Err(ConfigError::invalid("workflow.id_max_attempts", "must be at least 1"));
        }
        if !(3..=12).contains(&self.workflow.id_suffix_len) {
            return Err(ConfigError::invalid(
                "workflow.id_suffix_len",
                "must be between 3 and 12",
            ));
        }

        let ledger = &self.ledger;
        if ledger.max_attempts == 0 {
            return Err(ConfigError::invalid("ledger.max_attempts", "must be at least 1"));
        }
        if !ledger.multiplier.is_finite() || ledger.multiplier < 1.0 {
            return Err(ConfigError::invalid("ledger.multiplier", "must be >= 1.0"));
        }
        if !(0.0..1.0).contains(&ledger.jitter) {
            return Err(ConfigError::invalid("ledger.jitter", "must be in [0, 1)"));
        }
        if ledger.base_delay_ms > ledger.max_delay_ms {
            return Err(ConfigError::invalid(
                "ledger.base_delay_ms",
                "must not exceed ledger.max_delay_ms",
            ));
        }
        if ledger.attempt_timeout_ms == 0 {
            return Err(ConfigError::invalid("ledger.attempt_timeout_ms", "must be positive"));
        }

        if self.verification.query_timeout_ms == 0 {
            return Err(ConfigError::invalid(
                "verification.query_timeout_ms",
                "must be positive",
            ));
        }
        if self.event_bus.channel_capacity == 0 {
            return Err(ConfigError::invalid("event_bus.channel_capacity", "must be positive"));
        }
        Ok(())
    }
}

fn override_parsed<T, F>(var: &F, name: &str, slot: &mut T) -> Result<(), ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = var(name) {
        *slot = raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::invalid(name, format!("{raw:?}: {e}")))?;
    }
    Ok(())
}

/// Batch workflow configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowSection {
    /// Id candidates tried before giving up.
    pub id_max_attempts: u32,
    /// Random suffix length of generated ids.
    pub id_suffix_len: usize,
}

impl Default for WorkflowSection {
    fn default() -> Self {
        let defaults = WorkflowConfig::default();
        Self {
            id_max_attempts: defaults.id_max_attempts,
            id_suffix_len: defaults.id_suffix_len,
        }
    }
}

impl WorkflowSection {
    pub fn workflow_config(&self) -> WorkflowConfig {
        WorkflowConfig {
            id_max_attempts: self.id_max_attempts,
            id_suffix_len: self.id_suffix_len,
        }
    }
}

/// Which ledger adapter the node runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerMode {
    /// Process-local ledger. Facts are confirmed but not durable.
    #[default]
    Memory,
    /// No ledger. Every submit fails and facts end `failed`.
    Disabled,
}

impl FromStr for LedgerMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(LedgerMode::Memory),
            "disabled" | "none" => Ok(LedgerMode::Disabled),
            other => Err(format!("unknown ledger mode '{other}'")),
        }
    }
}

/// Ledger mirror configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerSection {
    pub mode: LedgerMode,
    /// Attempts per fact, including the first.
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub multiplier: f64,
    pub max_delay_ms: u64,
    /// Fraction of each backoff delay randomized in either direction.
    pub jitter: f64,
    /// Bound on one put + submit.
    pub attempt_timeout_ms: u64,
}

impl Default for LedgerSection {
    fn default() -> Self {
        let retry = RetryPolicy::default();
        Self {
            mode: LedgerMode::default(),
            max_attempts: retry.max_attempts,
            base_delay_ms: retry.base_delay.as_millis() as u64,
            multiplier: retry.multiplier,
            max_delay_ms: retry.max_delay.as_millis() as u64,
            jitter: retry.jitter,
            attempt_timeout_ms: hc_02_ledger_mirror::DEFAULT_ATTEMPT_TIMEOUT.as_millis() as u64,
        }
    }
}

impl LedgerSection {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.base_delay_ms),
            multiplier: self.multiplier,
            max_delay: Duration::from_millis(self.max_delay_ms),
            jitter: self.jitter,
        }
    }

    pub fn recorder_config(&self) -> RecorderConfig {
        RecorderConfig {
            retry: self.retry_policy(),
            attempt_timeout: Duration::from_millis(self.attempt_timeout_ms),
        }
    }
}

/// Periodic verification configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationSection {
    /// Seconds between sweeps over recorded batches. 0 disables the sweep.
    pub sweep_interval_secs: u64,
    /// Bound on one ledger query.
    pub query_timeout_ms: u64,
}

impl Default for VerificationSection {
    fn default() -> Self {
        Self {
            sweep_interval_secs: 300,
            query_timeout_ms: 5_000,
        }
    }
}

impl VerificationSection {
    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.sweep_interval_secs > 0).then(|| Duration::from_secs(self.sweep_interval_secs))
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }
}

/// Event bus configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventBusSection {
    /// Events buffered per subscriber before it lags.
    pub channel_capacity: usize,
}

impl Default for EventBusSection {
    fn default() -> Self {
        Self {
            channel_capacity: shared_bus::DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = NodeConfig::default();
        assert_eq!(config.workflow.id_max_attempts, 5);
        assert_eq!(config.workflow.id_suffix_len, 6);
        assert_eq!(config.ledger.mode, LedgerMode::Memory);
        assert_eq!(config.ledger.retry_policy(), RetryPolicy::default());
        assert_eq!(config.event_bus.channel_capacity, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = NodeConfig::default();
        config
            .apply_overrides(lookup(&[
                ("HC_LEDGER_MODE", "disabled"),
                ("HC_LEDGER_MAX_ATTEMPTS", "3"),
                ("HC_LEDGER_BASE_DELAY_MS", "10"),
                ("HC_VERIFY_SWEEP_SECS", "0"),
                ("HC_EVENT_BUS_CAPACITY", " 64 "),
            ]))
            .unwrap();

        assert_eq!(config.ledger.mode, LedgerMode::Disabled);
        assert_eq!(config.ledger.max_attempts, 3);
        assert_eq!(
            config.ledger.retry_policy().base_delay,
            Duration::from_millis(10)
        );
        assert_eq!(config.verification.sweep_interval(), None);
        assert_eq!(config.event_bus.channel_capacity, 64);
    }

    #[test]
    fn test_env_override_unparsable_value() {
        let mut config = NodeConfig::default();
        let err = config
            .apply_overrides(lookup(&[("HC_LEDGER_JITTER", "lots")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref field, .. } if field == "HC_LEDGER_JITTER"));
    }

    #[test]
    fn test_empty_env_value_is_ignored() {
        let mut config = NodeConfig::default();
        config
            .apply_overrides(lookup(&[("HC_LEDGER_MODE", "")]))
            .unwrap();
        assert_eq!(config.ledger.mode, LedgerMode::Memory);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = NodeConfig::from_toml_str(
            r#"
            [ledger]
            mode = "disabled"
            max_attempts = 2

            [verification]
            sweep_interval_secs = 30
            "#,
        )
        .unwrap();

        assert_eq!(config.ledger.mode, LedgerMode::Disabled);
        assert_eq!(config.ledger.max_attempts, 2);
        assert_eq!(config.ledger.multiplier, 2.0);
        assert_eq!(
            config.verification.sweep_interval(),
            Some(Duration::from_secs(30))
        );
        assert_eq!(config.workflow, WorkflowSection::default());
    }

    #[test]
    fn test_invalid_toml() {
        let err = NodeConfig::from_toml_str("[ledger]\nmode = \"ethereum\"").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[event_bus]\nchannel_capacity = 16").unwrap();

        let config = NodeConfig::load(file.path()).unwrap();
        assert_eq!(config.event_bus.channel_capacity, 16);
    }

    #[test]
    fn test_load_missing_file() {
        let err = NodeConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = NodeConfig::default();
        config.ledger.jitter = 1.5;
        assert!(config.validate().is_err());

        let mut config = NodeConfig::default();
        config.ledger.base_delay_ms = 60_000;
        assert!(config.validate().is_err());

        let mut config = NodeConfig::default();
        config.workflow.id_suffix_len = 2;
        assert!(config.validate().is_err());

        let mut config = NodeConfig::default();
        config.ledger.max_attempts = 0;
        assert!(config.validate().is_err());
    }
}
