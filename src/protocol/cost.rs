use std::fmt;

use crate::config::SimConfig;

/// Maps a link's capacity and current load to the routing cost a router
/// advertises for it. Non-positive bandwidth always yields infinity.
pub trait CostStrategy: Send + Sync + fmt::Debug {
    fn link_cost(&self, bandwidth: f64, load: f64) -> f64;
}

fn inverse_bandwidth(ref_bandwidth: f64, bandwidth: f64) -> f64 {
    if bandwidth > 0.0 && bandwidth.is_finite() {
        ref_bandwidth / bandwidth
    } else {
        f64::INFINITY
    }
}

/// Standard OSPF metric.
#[derive(Debug, Clone)]
pub struct InverseBandwidth {
    pub ref_bandwidth: f64,
}

impl InverseBandwidth {
    pub fn new(config: &SimConfig) -> Self {
        Self {
            ref_bandwidth: config.ref_bandwidth,
        }
    }
}

impl CostStrategy for InverseBandwidth {
    fn link_cost(&self, bandwidth: f64, _load: f64) -> f64 {
        inverse_bandwidth(self.ref_bandwidth, bandwidth)
    }
}

/// Inverse-bandwidth cost scaled by `1 + weight * utilization^exponent`,
/// utilization clamped to `[0, 1]`.
#[derive(Debug, Clone)]
pub struct UtilizationAware {
    pub ref_bandwidth: f64,
    pub weight: f64,
    pub exponent: f64,
}

impl UtilizationAware {
    pub fn new(config: &SimConfig) -> Self {
        Self {
            ref_bandwidth: config.ref_bandwidth,
            weight: config.utilization_weight,
            exponent: config.utilization_exponent,
        }
    }
}

impl CostStrategy for UtilizationAware {
    fn link_cost(&self, bandwidth: f64, load: f64) -> f64 {
        let base = inverse_bandwidth(self.ref_bandwidth, bandwidth);
        if !base.is_finite() {
            return base;
        }
        let utilization = (load / bandwidth).clamp(0.0, 1.0);
        base * (1.0 + self.weight * utilization.powf(self.exponent))
    }
}
