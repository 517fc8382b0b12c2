pub mod topology_config;

pub use topology_config::{LinkSpec, Topology, TopologyConfig};

use serde::{Deserialize, Serialize};
use std::fs;

use crate::error::{Result, SimError};

/// Tunables shared by every router and link of a simulation run.
///
/// Durations are expressed in ticks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Trailing traffic level below which a link (EcoRP) attempts to sleep.
    pub sleep_threshold: f64,
    /// Utilization (load over bandwidth) above which a router restores its
    /// sleeping links (EcoRP).
    pub upper_threshold: f64,
    /// Reference bandwidth for `cost = ref_bandwidth / bandwidth`.
    pub ref_bandwidth: f64,
    /// Energy drawn per tick by a router that is not sleeping.
    pub active_node_cost: f64,
    /// Energy drawn per tick by a link that is not sleeping.
    pub active_link_cost: f64,
    /// Age after which an LSA is purged from a database.
    pub max_age: u64,
    /// Seed for the synthetic traffic generator.
    pub random_seed: u64,
    /// Consecutive low-traffic ticks required before a sleep transition.
    pub sleep_dwell: u64,
    pub lsa_refresh_interval: u64,
    /// Cadence of the passive statistics sampler.
    pub poll_interval: u64,
    /// Weight of the newest tick in the exponentially averaged link load.
    pub traffic_smoothing: f64,
    pub utilization_weight: f64,
    pub utilization_exponent: f64,
    /// Cost changes at or below this are not re-advertised.
    pub cost_epsilon: f64,
    /// Energy per unit of carried traffic.
    pub throughput_energy: f64,
    /// Energy charged for each sleep or wake transition.
    pub transition_cost: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            sleep_threshold: 5.0,
            upper_threshold: 0.8,
            ref_bandwidth: 100.0,
            active_node_cost: 20.0,
            active_link_cost: 10.0,
            max_age: 3600,
            random_seed: 0,
            sleep_dwell: 5,
            lsa_refresh_interval: 1800,
            poll_interval: 1,
            traffic_smoothing: 0.5,
            utilization_weight: 1.0,
            utilization_exponent: 2.0,
            cost_epsilon: 0.01,
            throughput_energy: 0.0,
            transition_cost: 0.0,
        }
    }
}

impl SimConfig {
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(SimError::InvalidConfig(msg.to_string()));

        if !(self.ref_bandwidth > 0.0) {
            return invalid("ref_bandwidth must be positive");
        }
        if self.max_age == 0 {
            return invalid("max_age must be at least one tick");
        }
        if self.lsa_refresh_interval == 0 || self.lsa_refresh_interval >= self.max_age {
            return invalid("lsa_refresh_interval must be in 1..max_age");
        }
        if !(self.upper_threshold > 0.0) {
            return invalid("upper_threshold must be positive");
        }
        if self.poll_interval == 0 {
            return invalid("poll_interval must be at least one tick");
        }
        if !(self.traffic_smoothing > 0.0 && self.traffic_smoothing <= 1.0) {
            return invalid("traffic_smoothing must be in (0, 1]");
        }
        let non_negative = [
            ("sleep_threshold", self.sleep_threshold),
            ("active_node_cost", self.active_node_cost),
            ("active_link_cost", self.active_link_cost),
            ("utilization_weight", self.utilization_weight),
            ("utilization_exponent", self.utilization_exponent),
            ("cost_epsilon", self.cost_epsilon),
            ("throughput_energy", self.throughput_energy),
            ("transition_cost", self.transition_cost),
        ];
        for (name, value) in non_negative {
            if !(value >= 0.0) {
                return Err(SimError::InvalidConfig(format!("{} must be non-negative", name)));
            }
        }

        Ok(())
    }

    pub fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: SimConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(SimConfig::default().validate().is_ok());
    }

    #[test]
    fn refresh_must_precede_max_age() {
        let config = SimConfig {
            max_age: 10,
            lsa_refresh_interval: 10,
            ..SimConfig::default()
        };
        assert!(matches!(config.validate(), Err(SimError::InvalidConfig(_))));
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: SimConfig = serde_json::from_str(r#"{ "sleep_threshold": 2.5 }"#).unwrap();
        assert_eq!(config.sleep_threshold, 2.5);
        assert_eq!(config.max_age, SimConfig::default().max_age);
    }

    #[test]
    fn file_errors_keep_their_kind() {
        let missing = std::env::temp_dir().join("eco-ospf-missing-config.json");
        assert!(matches!(SimConfig::load(missing.to_str().unwrap()), Err(SimError::Io(_))));

        let path = std::env::temp_dir().join(format!("eco-ospf-config-{}.json", std::process::id()));
        let path = path.to_str().unwrap();
        fs::write(path, "{ not json").unwrap();
        assert!(matches!(SimConfig::load(path), Err(SimError::Json(_))));

        fs::write(path, r#"{ "poll_interval": 0 }"#).unwrap();
        assert!(matches!(SimConfig::load(path), Err(SimError::InvalidConfig(_))));

        SimConfig::default().save(path).unwrap();
        assert_eq!(SimConfig::load(path).unwrap().upper_threshold, 0.8);
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn nan_smoothing_is_rejected() {
        let config = SimConfig {
            traffic_smoothing: f64::NAN,
            ..SimConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
