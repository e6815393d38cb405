//! Run configuration for simulations.
//!
//! All tunable parameters of a single run are defined here. Behavior
//! switches default to first-edge load balancing and no cache short-circuit.

use serde::{Deserialize, Serialize};

/// Errors raised when a configuration cannot start a run.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Simulation duration must be at least one second")]
    ZeroDuration,

    #[error("Requests per second must be a positive finite number, got {rps}")]
    InvalidRequestRate { rps: f64 },
}

/// How load balancers pick a downstream edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LoadBalancing {
    /// Always the first unvisited outgoing edge.
    #[default]
    FirstEdge,
    /// Rotate across outgoing edges, one cursor per load balancer per run.
    RoundRobin,
}

/// Behavior switches for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SimulationOptions {
    pub load_balancing: LoadBalancing,
    /// Stop fan-out below a cache node when a hit is drawn.
    pub cache_short_circuit: bool,
}

/// Parameters of one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunConfig {
    /// Number of one-second ticks to simulate.
    pub duration_seconds: u32,
    /// Target request rate split across all traffic sources.
    pub requests_per_second: f64,
    /// Seed for reproducible runs. `None` draws from ambient entropy.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub options: SimulationOptions,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            duration_seconds: 60,
            requests_per_second: 100.0,
            seed: None,
            options: SimulationOptions::default(),
        }
    }
}

impl RunConfig {
    /// Creates an unseeded configuration.
    pub fn new(duration_seconds: u32, requests_per_second: f64) -> Self {
        Self {
            duration_seconds,
            requests_per_second,
            ..Default::default()
        }
    }

    /// Creates a configuration for deterministic testing.
    pub fn deterministic_testing() -> Self {
        Self {
            duration_seconds: 10,    // Short runs keep tests fast
            requests_per_second: 100.0,
            seed: Some(42),          // Fixed seed for reproducible tests
            options: SimulationOptions::default(),
        }
    }

    /// Sets the seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Sets behavior switches.
    pub fn with_options(mut self, options: SimulationOptions) -> Self {
        self.options = options;
        self
    }

    /// Checks run preconditions.
    ///
    /// # Errors
    ///
    /// - `ConfigError::ZeroDuration` - If the duration is zero
    /// - `ConfigError::InvalidRequestRate` - If the rate is not a positive finite number
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.duration_seconds == 0 {
            return Err(ConfigError::ZeroDuration);
        }
        if !self.requests_per_second.is_finite() || self.requests_per_second <= 0.0 {
            return Err(ConfigError::InvalidRequestRate {
                rps: self.requests_per_second,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(RunConfig::default().validate().is_ok());
        assert!(RunConfig::deterministic_testing().validate().is_ok());
    }

    #[test]
    fn test_zero_duration_rejected() {
        let config = RunConfig::new(0, 10.0);
        assert_eq!(config.validate(), Err(ConfigError::ZeroDuration));
    }

    #[test]
    fn test_invalid_rates_rejected() {
        for rps in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            let result = RunConfig::new(10, rps).validate();
            assert!(matches!(result, Err(ConfigError::InvalidRequestRate { .. })));
        }
    }

    #[test]
    fn test_options_default_to_first_edge_without_short_circuit() {
        let options = SimulationOptions::default();
        assert_eq!(options.load_balancing, LoadBalancing::FirstEdge);
        assert!(!options.cache_short_circuit);
    }

    #[test]
    fn test_config_deserializes_without_optional_fields() {
        let config: RunConfig =
            serde_json::from_str(r#"{ "durationSeconds": 5, "requestsPerSecond": 20 }"#).unwrap();
        assert_eq!(config.duration_seconds, 5);
        assert_eq!(config.seed, None);
        assert_eq!(config.options, SimulationOptions::default());
    }
}
