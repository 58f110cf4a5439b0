//! # Engine Configuration
//!
//! Tunable policy parameters for the engine. Everything here is policy, not
//! contract: the engine's guarantees hold for any valid configuration.
//!
//! ## Configuration File Format
//! ```toml
//! # engine.toml
//! unpaid_order_window_secs = 900   # auto-cancel AwaitingPayment after 15 min
//! sweep_interval_secs = 30         # how often the reconciliation sweep runs
//! gateway_timeout_secs = 10        # per-attempt outbound gateway timeout
//! gateway_retry_budget_secs = 30   # total time spent retrying timed-out charges
//! hub_buffer = 256                 # per-outlet broadcast channel capacity
//! ```
//!
//! Missing keys fall back to defaults, so an empty file (or no file) is a
//! valid configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{EngineError, EngineResult};

// =============================================================================
// Engine Config
// =============================================================================

/// Engine policy parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// An `AwaitingPayment` order older than this is a candidate for
    /// automatic cancellation by the reconciliation sweep.
    pub unpaid_order_window_secs: u64,

    /// How often the reconciliation sweep wakes up.
    pub sweep_interval_secs: u64,

    /// Per-attempt timeout for outbound gateway calls.
    pub gateway_timeout_secs: u64,

    /// Total budget for retrying timed-out charge attempts with backoff.
    pub gateway_retry_budget_secs: u64,

    /// Capacity of each per-outlet broadcast channel. A subscriber that lags
    /// past this many events misses them and relies on its next snapshot.
    pub hub_buffer: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            unpaid_order_window_secs: 900,
            sweep_interval_secs: 30,
            gateway_timeout_secs: 10,
            gateway_retry_budget_secs: 30,
            hub_buffer: 256,
        }
    }
}

impl EngineConfig {
    /// Parses a TOML document into a config, applying defaults for missing
    /// keys and validating ranges.
    pub fn from_toml_str(raw: &str) -> EngineResult<Self> {
        let config: EngineConfig =
            toml::from_str(raw).map_err(|e| EngineError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| EngineError::ConfigLoad(format!("{}: {}", path.display(), e)))?;
        let config = Self::from_toml_str(&raw)?;
        info!(path = %path.display(), "Engine config loaded");
        Ok(config)
    }

    /// Validates parameter ranges.
    pub fn validate(&self) -> EngineResult<()> {
        if self.unpaid_order_window_secs == 0 {
            return Err(EngineError::InvalidConfig(
                "unpaid_order_window_secs must be > 0".into(),
            ));
        }
        if self.sweep_interval_secs == 0 {
            return Err(EngineError::InvalidConfig(
                "sweep_interval_secs must be > 0".into(),
            ));
        }
        if self.gateway_timeout_secs == 0 {
            return Err(EngineError::InvalidConfig(
                "gateway_timeout_secs must be > 0".into(),
            ));
        }
        if self.hub_buffer == 0 {
            return Err(EngineError::InvalidConfig("hub_buffer must be > 0".into()));
        }
        Ok(())
    }

    /// The unpaid-order expiry window as a chrono duration (compared against
    /// order timestamps).
    pub fn unpaid_order_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.unpaid_order_window_secs as i64)
    }

    /// The sweep wake-up interval.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Per-attempt gateway call timeout.
    pub fn gateway_timeout(&self) -> Duration {
        Duration::from_secs(self.gateway_timeout_secs)
    }

    /// Total retry budget for timed-out gateway charges.
    pub fn gateway_retry_budget(&self) -> Duration {
        Duration::from_secs(self.gateway_retry_budget_secs)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.unpaid_order_window_secs, 900);
        assert_eq!(config.sweep_interval_secs, 30);
    }

    #[test]
    fn empty_toml_yields_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config.hub_buffer, 256);
    }

    #[test]
    fn partial_toml_overrides_only_named_keys() {
        let config =
            EngineConfig::from_toml_str("unpaid_order_window_secs = 60\nhub_buffer = 16\n")
                .unwrap();
        assert_eq!(config.unpaid_order_window_secs, 60);
        assert_eq!(config.hub_buffer, 16);
        // untouched key keeps its default
        assert_eq!(config.gateway_timeout_secs, 10);
    }

    #[test]
    fn zero_window_is_rejected() {
        let err = EngineConfig::from_toml_str("unpaid_order_window_secs = 0").unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig(_)));
    }

    #[test]
    fn garbage_toml_is_a_parse_error() {
        let err = EngineConfig::from_toml_str("not valid = = toml").unwrap_err();
        assert!(matches!(err, EngineError::ConfigParse(_)));
    }
}
