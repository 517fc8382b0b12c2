use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::link::{LinkState, LinkStats};
use super::traffic::TrafficMetrics;
use crate::protocol::{Protocol, RoutingEntry};
use crate::router::{RouterState, RouterStats};
use crate::{LinkId, RouterId};

/// Read-only copy of a network, taken between ticks.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub run_id: Uuid,
    pub taken_at: DateTime<Utc>,
    pub protocol: Protocol,
    pub time: u64,
    pub total_energy: f64,
    pub pending_packets: usize,
    pub in_flight: usize,
    pub routers: Vec<RouterSnapshot>,
    pub links: Vec<LinkSnapshot>,
    pub traffic: TrafficMetrics,
}

#[derive(Debug, Clone, Serialize)]
pub struct RouterSnapshot {
    pub id: RouterId,
    pub state: RouterState,
    pub sequence: u64,
    pub lsdb_size: usize,
    pub routes: Vec<RoutingEntry>,
    pub stats: RouterStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct LinkSnapshot {
    pub id: LinkId,
    pub a: RouterId,
    pub b: RouterId,
    pub bandwidth: f64,
    pub state: LinkState,
    /// Trailing load `a -> b` and `b -> a`.
    pub load: [f64; 2],
    pub stats: LinkStats,
}

/// Periodic poll of network-wide counters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample {
    pub time: u64,
    pub energy: f64,
    /// Energy per tick since the previous sample.
    pub power: f64,
    pub delivered: u64,
    pub dropped: u64,
    pub active_links: usize,
    pub active_routers: usize,
}
