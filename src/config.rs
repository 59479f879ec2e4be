//! Player configuration and environment overlay.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::bridge::BridgeConfig;
use crate::error::ValidationError;
use crate::policy::RiskPolicy;
use crate::simulator::SimulatorConfig;

/// Backend base URL; unset means fixture mode only.
pub const ENV_BACKEND_URL: &str = "AXIOM_BACKEND_URL";
/// Simulator tick period in milliseconds.
pub const ENV_TICK_MS: &str = "AXIOM_TICK_MS";
/// Seed for reproducible simulator runs.
pub const ENV_SEED: &str = "AXIOM_SEED";
/// ALLOW threshold.
pub const ENV_THRESHOLD_ALLOW: &str = "RISK_THRESHOLD_ALLOW";
/// REWRITE threshold.
pub const ENV_THRESHOLD_REWRITE: &str = "RISK_THRESHOLD_REWRITE";

/// Everything a [`Player`](crate::Player) needs besides its catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Score simulator tuning and clock.
    pub simulator: SimulatorConfig,
    /// Thresholds authored actions are validated against.
    pub policy: RiskPolicy,
    /// Backend bridge settings.
    pub bridge: BridgeConfig,
    /// Seed for every simulator run; entropy when unset.
    pub seed: Option<u64>,
}

impl PlayerConfig {
    /// Defaults overlaid with process environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidConfig` for a variable that does not
    /// parse, or any error from [`PlayerConfig::validate`].
    pub fn from_env() -> Result<Self, ValidationError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Defaults overlaid with values from `lookup`.
    ///
    /// # Errors
    ///
    /// See [`PlayerConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ValidationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_BACKEND_URL) {
            let url = url.trim();
            if !url.is_empty() {
                config.bridge.base_url = Some(url.trim_end_matches('/').to_string());
            }
        }
        if let Some(ms) = parse_var::<u64>(&lookup, ENV_TICK_MS)? {
            config.simulator.tick_period = Duration::from_millis(ms);
        }
        if let Some(seed) = parse_var::<u64>(&lookup, ENV_SEED)? {
            config.seed = Some(seed);
        }
        if let Some(allow) = parse_var::<f64>(&lookup, ENV_THRESHOLD_ALLOW)? {
            config.policy.allow_above = allow;
        }
        if let Some(rewrite) = parse_var::<f64>(&lookup, ENV_THRESHOLD_REWRITE)? {
            config.policy.rewrite_from = rewrite;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validates every section.
    ///
    /// # Errors
    ///
    /// Returns the first `ValidationError` found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.simulator.validate()?;
        self.policy.validate()?;
        self.bridge.validate()
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, ValidationError> {
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<T>()
        .map(Some)
        .map_err(|_| ValidationError::InvalidConfig {
            key: key.to_string(),
            value: raw.clone(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_env() {
        let config = PlayerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, PlayerConfig::default());
        assert!(config.bridge.base_url.is_none());
        assert!(config.seed.is_none());
    }

    #[test]
    fn test_overlay() {
        let config = PlayerConfig::from_lookup(lookup(&[
            (ENV_BACKEND_URL, "http://localhost:8000/"),
            (ENV_TICK_MS, "50"),
            (ENV_SEED, "42"),
            (ENV_THRESHOLD_ALLOW, "0.85"),
            (ENV_THRESHOLD_REWRITE, "0.35"),
        ]))
        .unwrap();
        assert_eq!(config.bridge.base_url.as_deref(), Some("http://localhost:8000"));
        assert_eq!(config.simulator.tick_period, Duration::from_millis(50));
        assert_eq!(config.seed, Some(42));
        assert!((config.policy.allow_above - 0.85).abs() < f64::EPSILON);
        assert!((config.policy.rewrite_from - 0.35).abs() < f64::EPSILON);
    }

    #[test]
    fn test_malformed_value() {
        let err = PlayerConfig::from_lookup(lookup(&[(ENV_SEED, "forty-two")])).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidConfig { ref key, .. } if key == ENV_SEED));
    }

    #[test]
    fn test_inverted_thresholds_rejected() {
        let err = PlayerConfig::from_lookup(lookup(&[
            (ENV_THRESHOLD_ALLOW, "0.3"),
            (ENV_THRESHOLD_REWRITE, "0.6"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidThresholds { .. }));
    }

    #[test]
    fn test_zero_tick_rejected() {
        assert!(PlayerConfig::from_lookup(lookup(&[(ENV_TICK_MS, "0")])).is_err());
    }

    #[test]
    fn test_blank_values_ignored() {
        let config =
            PlayerConfig::from_lookup(lookup(&[(ENV_BACKEND_URL, "  "), (ENV_SEED, "")])).unwrap();
        assert!(config.bridge.base_url.is_none());
        assert!(config.seed.is_none());
    }
}
