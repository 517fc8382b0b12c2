pub mod cost;
pub mod lsdb;
pub mod messages;
pub mod routing_table;
pub mod sleep;

pub use cost::*;
pub use lsdb::*;
pub use messages::*;
pub use routing_table::*;
pub use sleep::*;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::config::SimConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// Standard OSPF, inverse-bandwidth costs.
    Ospf,
    /// Utilization-aware costs, links and routers never sleep.
    Gospf,
    /// Utilization-aware costs plus link and router sleeping.
    #[value(name = "ecorp")]
    EcoRp,
}

impl Protocol {
    pub fn cost_strategy(&self, config: &SimConfig) -> Arc<dyn CostStrategy> {
        match self {
            Protocol::Ospf => Arc::new(InverseBandwidth::new(config)),
            Protocol::Gospf | Protocol::EcoRp => Arc::new(UtilizationAware::new(config)),
        }
    }

    pub fn sleep_policy(&self, config: &SimConfig) -> Arc<dyn SleepPolicy> {
        match self {
            Protocol::Ospf | Protocol::Gospf => Arc::new(NeverSleep),
            Protocol::EcoRp => Arc::new(DwellSleep::new(config)),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Ospf => write!(f, "OSPF"),
            Protocol::Gospf => write!(f, "GOSPF"),
            Protocol::EcoRp => write!(f, "EcoRP"),
        }
    }
}
