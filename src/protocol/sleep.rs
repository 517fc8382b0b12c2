use std::fmt;

use crate::config::SimConfig;

/// Decides when links and routers may enter the sleeping state.
pub trait SleepPolicy: Send + Sync + fmt::Debug {
    fn sleeps(&self) -> bool;

    /// Whether a trailing load counts towards the low-traffic dwell.
    fn is_idle_load(&self, load: f64) -> bool;

    fn dwell_elapsed(&self, idle_ticks: u64) -> bool;

    /// Whether a link's outgoing load calls for its sleeping siblings to be
    /// restored.
    fn is_overloaded(&self, load: f64, bandwidth: f64) -> bool;
}

/// OSPF and GOSPF: everything stays active.
#[derive(Debug, Clone, Default)]
pub struct NeverSleep;

impl SleepPolicy for NeverSleep {
    fn sleeps(&self) -> bool {
        false
    }

    fn is_idle_load(&self, _load: f64) -> bool {
        false
    }

    fn dwell_elapsed(&self, _idle_ticks: u64) -> bool {
        false
    }

    fn is_overloaded(&self, _load: f64, _bandwidth: f64) -> bool {
        false
    }
}

/// EcoRP: sleep after `dwell` consecutive ticks below `threshold`, graft
/// sleeping links back once utilization exceeds `upper_threshold`.
#[derive(Debug, Clone)]
pub struct DwellSleep {
    pub threshold: f64,
    pub dwell: u64,
    pub upper_threshold: f64,
}

impl DwellSleep {
    pub fn new(config: &SimConfig) -> Self {
        Self {
            threshold: config.sleep_threshold,
            dwell: config.sleep_dwell,
            upper_threshold: config.upper_threshold,
        }
    }
}

impl SleepPolicy for DwellSleep {
    fn sleeps(&self) -> bool {
        true
    }

    fn is_idle_load(&self, load: f64) -> bool {
        load < self.threshold
    }

    fn dwell_elapsed(&self, idle_ticks: u64) -> bool {
        idle_ticks >= self.dwell
    }

    fn is_overloaded(&self, load: f64, bandwidth: f64) -> bool {
        bandwidth > 0.0 && load / bandwidth > self.upper_threshold
    }
}
