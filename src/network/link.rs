use serde::{Deserialize, Serialize};

use crate::config::{LinkSpec, SimConfig};
use crate::protocol::SleepPolicy;
use crate::{LinkId, RouterId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkState {
    Active,
    /// Powering up; carries nothing until the next tick.
    Waking,
    Sleeping,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinkStats {
    pub energy: f64,
    pub traffic: f64,
    pub dropped_volume: f64,
    pub dropped_packets: u64,
    pub transitions: u64,
    pub sleeping_ticks: u64,
}

/// Full-duplex link between routers `a` and `b`. Load is tracked per
/// direction: index 0 is `a -> b`, index 1 is `b -> a`.
#[derive(Debug, Clone)]
pub struct Link {
    pub id: LinkId,
    pub a: RouterId,
    pub b: RouterId,
    pub bandwidth: f64,
    state: LinkState,
    load: [f64; 2],
    carried: [f64; 2],
    idle_ticks: u64,
    transitions_this_tick: u64,
    pub stats: LinkStats,
}

/// What happened to a link at the end of a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkTick {
    Unchanged,
    FellAsleep,
}

impl Link {
    pub fn new(id: LinkId, spec: &LinkSpec) -> Self {
        Self {
            id,
            a: spec.a,
            b: spec.b,
            bandwidth: spec.bandwidth,
            state: LinkState::Active,
            load: [0.0; 2],
            carried: [0.0; 2],
            idle_ticks: 0,
            transitions_this_tick: 0,
            stats: LinkStats::default(),
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == LinkState::Active
    }

    pub fn other_end(&self, router: RouterId) -> Option<RouterId> {
        if router == self.a {
            Some(self.b)
        } else if router == self.b {
            Some(self.a)
        } else {
            None
        }
    }

    fn direction(&self, from: RouterId) -> usize {
        if from == self.a { 0 } else { 1 }
    }

    /// Trailing load leaving `from` over this link.
    pub fn load_from(&self, from: RouterId) -> f64 {
        self.load[self.direction(from)]
    }

    pub fn total_load(&self) -> f64 {
        self.load[0] + self.load[1]
    }

    pub fn carried_this_tick(&self) -> f64 {
        self.carried[0] + self.carried[1]
    }

    /// Puts `volume` on the wire from `from`. Fails when the link is not
    /// active or the direction's per-tick capacity would be exceeded; an
    /// overflow is counted as a drop.
    pub fn carry(&mut self, from: RouterId, volume: f64) -> bool {
        if !self.is_active() {
            return false;
        }
        let dir = self.direction(from);
        if self.carried[dir] + volume > self.bandwidth {
            self.stats.dropped_volume += volume;
            self.stats.dropped_packets += 1;
            return false;
        }
        self.carried[dir] += volume;
        true
    }

    /// Sleeping -> Waking. Returns false if the link was not sleeping.
    pub fn wake(&mut self) -> bool {
        if self.state != LinkState::Sleeping {
            return false;
        }
        self.state = LinkState::Waking;
        self.idle_ticks = 0;
        self.transitions_this_tick += 1;
        true
    }

    /// Waking -> Active. Returns true if the link just became active.
    pub fn complete_wake(&mut self) -> bool {
        if self.state != LinkState::Waking {
            return false;
        }
        self.state = LinkState::Active;
        true
    }

    /// Folds this tick's carried volume into the trailing load, charges
    /// energy for the tick and applies the sleep policy.
    pub fn end_tick(&mut self, config: &SimConfig, policy: &dyn SleepPolicy) -> LinkTick {
        let carried = self.carried_this_tick();
        for dir in 0..2 {
            self.load[dir] = config.traffic_smoothing * self.carried[dir]
                + (1.0 - config.traffic_smoothing) * self.load[dir];
        }
        self.carried = [0.0; 2];
        self.stats.traffic += carried;

        if self.state == LinkState::Sleeping {
            self.stats.sleeping_ticks += 1;
        } else {
            self.stats.energy += config.active_link_cost;
        }
        self.stats.energy += config.throughput_energy * carried;

        let mut outcome = LinkTick::Unchanged;
        if self.state == LinkState::Active && policy.sleeps() {
            if policy.is_idle_load(self.total_load()) {
                self.idle_ticks += 1;
            } else {
                self.idle_ticks = 0;
            }
            if policy.dwell_elapsed(self.idle_ticks) {
                self.state = LinkState::Sleeping;
                self.idle_ticks = 0;
                self.transitions_this_tick += 1;
                outcome = LinkTick::FellAsleep;
            }
        }

        self.stats.transitions += self.transitions_this_tick;
        self.stats.energy += config.transition_cost * self.transitions_this_tick as f64;
        self.transitions_this_tick = 0;
        outcome
    }
}
