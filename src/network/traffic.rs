use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::RouterId;

/// A unit of user traffic walking hop by hop towards `dst`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flow {
    pub id: u64,
    pub src: RouterId,
    pub dst: RouterId,
    pub volume: f64,
    /// Router currently holding the flow.
    pub at: RouterId,
    pub hops: usize,
    pub injected_at: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DropReason {
    /// No committed route at the router holding the flow.
    Unreachable,
    /// The next link had no capacity left this tick.
    Congestion,
    /// The flow visited more hops than there are routers.
    HopLimit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DropRecord {
    pub time: u64,
    pub flow: u64,
    pub at: RouterId,
    pub reason: DropReason,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrafficMetrics {
    pub injected: u64,
    pub delivered: u64,
    pub delivered_volume: f64,
    pub dropped_volume: f64,
    /// Sum over delivered flows of ticks spent in the network.
    pub total_latency: u64,
    pub drops: Vec<DropRecord>,
}

impl TrafficMetrics {
    pub fn dropped(&self) -> u64 {
        self.drops.len() as u64
    }

    pub fn dropped_by(&self, reason: DropReason) -> u64 {
        self.drops.iter().filter(|d| d.reason == reason).count() as u64
    }

    pub fn mean_latency(&self) -> Option<f64> {
        (self.delivered > 0).then(|| self.total_latency as f64 / self.delivered as f64)
    }

    pub(crate) fn record_delivery(&mut self, flow: &Flow, now: u64) {
        self.delivered += 1;
        self.delivered_volume += flow.volume;
        self.total_latency += now.saturating_sub(flow.injected_at);
    }

    pub(crate) fn record_drop(&mut self, flow: &Flow, now: u64, reason: DropReason) {
        self.dropped_volume += flow.volume;
        self.drops.push(DropRecord {
            time: now,
            flow: flow.id,
            at: flow.at,
            reason,
        });
    }
}

/// Seeded source of random demands. Two generators with the same seed
/// produce the same sequence.
#[derive(Debug, Clone)]
pub struct TrafficGenerator {
    rng: StdRng,
}

impl TrafficGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Picks a `(src, dst, volume)` demand with `src != dst` and volume in
    /// `(0, max_volume]`. Needs at least two routers.
    pub fn demand(&mut self, routers: &[RouterId], max_volume: f64) -> Option<(RouterId, RouterId, f64)> {
        if routers.len() < 2 || !(max_volume > 0.0) {
            return None;
        }
        let src = self.rng.gen_range(0..routers.len());
        let mut dst = self.rng.gen_range(0..routers.len() - 1);
        if dst >= src {
            dst += 1;
        }
        let volume = max_volume - self.rng.gen_range(0.0..max_volume);
        Some((routers[src], routers[dst], volume))
    }
}
