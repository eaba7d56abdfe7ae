//! Simulation configuration
//!
//! A single serde document carries every knob of a run: the distance
//! threshold, the latency model and the delivery/seed settings. Missing
//! fields fall back to defaults, so `{}` is a valid configuration.

use crate::harness::HarnessConfig;
use crate::latency::{FactorRange, LatencyConfig, LatencyError, LatencyModel, SeededFactors};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid latency settings: {0}")]
    Latency(#[from] LatencyError),

    #[error("threshold must be finite and non-negative, got {0}")]
    InvalidThreshold(f64),

    #[error("per-hop loss probability must be in [0, 1], got {0}")]
    InvalidLossProbability(f64),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration of one simulation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Maximum great-circle distance (km) for two servers to be linked
    pub threshold_km: f64,
    pub latency_per_km: f64,
    /// Weather multiplier range; `None` disables the factor
    pub weather_factor_range: Option<FactorRange>,
    /// Congestion multiplier range; `None` disables the factor
    pub congestion_factor_range: Option<FactorRange>,
    pub downtime_probability: f64,
    pub per_hop_loss_probability: f64,
    /// Seed for latency factors; `None` draws from OS entropy
    pub random_seed: Option<u64>,
    /// Optional per-algorithm budget in milliseconds
    pub time_budget_ms: Option<u64>,
    /// Run the algorithms of one comparison concurrently
    pub parallel: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            threshold_km: 2000.0,
            latency_per_km: 0.1,
            weather_factor_range: None,
            congestion_factor_range: None,
            downtime_probability: 0.0,
            per_hop_loss_probability: 0.01,
            random_seed: Some(42),
            time_budget_ms: None,
            parallel: false,
        }
    }
}

impl SimulationConfig {
    /// Load from a JSON file and validate
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Parse from a JSON string and validate
    pub fn from_json(text: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if !self.threshold_km.is_finite() || self.threshold_km < 0.0 {
            return Err(ConfigError::InvalidThreshold(self.threshold_km));
        }
        if !(0.0..=1.0).contains(&self.per_hop_loss_probability) {
            return Err(ConfigError::InvalidLossProbability(self.per_hop_loss_probability));
        }
        self.latency_config().validate()?;
        Ok(())
    }

    pub fn latency_config(&self) -> LatencyConfig {
        let defaults = LatencyConfig::default();
        LatencyConfig {
            latency_per_km: self.latency_per_km,
            weather_enabled: self.weather_factor_range.is_some(),
            weather_factor_range: self.weather_factor_range.unwrap_or(defaults.weather_factor_range),
            congestion_enabled: self.congestion_factor_range.is_some(),
            congestion_factor_range: self
                .congestion_factor_range
                .unwrap_or(defaults.congestion_factor_range),
            downtime_probability: self.downtime_probability,
        }
    }

    pub fn latency_model(&self) -> ConfigResult<LatencyModel> {
        Ok(LatencyModel::new(self.latency_config())?)
    }

    /// Factor source honouring `random_seed`
    pub fn factor_source(&self) -> SeededFactors {
        SeededFactors::from_optional_seed(self.random_seed)
    }

    /// Harness settings matched to this configuration's latency model
    pub fn harness_config(&self) -> ConfigResult<HarnessConfig> {
        let model = self.latency_model()?;
        Ok(HarnessConfig {
            time_budget: self.time_budget_ms.map(Duration::from_millis),
            parallel: self.parallel,
            ..HarnessConfig::for_latency_model(&model, self.per_hop_loss_probability)
        })
    }
}
