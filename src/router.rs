use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::algorithms::dijkstra::{compute_routes, Graph};
use crate::config::SimConfig;
use crate::protocol::{
    CostStrategy, HelloMessage, InstallResult, LinkAdvert, LinkStateDatabase, LsaMessage, Packet,
    Protocol, RoutingTable, SleepPolicy,
};
use crate::{LinkId, RouterId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouterState {
    Active,
    Sleeping,
    /// Woken this tick, becomes active (and reachable) on the next one.
    Waking,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouterStats {
    pub energy: f64,
    pub lsas_originated: u64,
    pub lsas_accepted: u64,
    pub lsas_discarded: u64,
    pub hellos_received: u64,
    pub probes_received: u64,
    pub traffic_originated: u64,
    pub traffic_forwarded: u64,
    pub traffic_received: f64,
    pub unreachable_drops: u64,
    /// Sleeping links restored because an incident link was overloaded.
    pub grafts: u64,
    pub transitions: u64,
    pub sleeping_ticks: u64,
}

/// Where the network should send a packet emitted by a router.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Every live neighbor except the one named.
    Flood { except: Option<RouterId> },
    Neighbor(RouterId),
}

#[derive(Debug, Clone)]
pub struct Outgoing {
    pub target: Target,
    pub packet: Packet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveOutcome {
    LsaInstalled,
    /// Stale, expired or self-originated LSA.
    LsaDiscarded,
    HelloAnswered,
    ProbeAnswered,
    Woken,
    /// Not accepted in the current state.
    Ignored,
}

/// A router's view of one incident link, used to derive its advertisement.
#[derive(Debug, Clone, Copy)]
pub struct LinkView {
    pub neighbor: RouterId,
    pub bandwidth: f64,
    /// Trailing load leaving this router over the link.
    pub load: f64,
    pub dormant: bool,
}

/// Link-state router. The protocol variant only selects the cost strategy
/// and the sleep policy; flooding and SPF are shared.
#[derive(Clone)]
pub struct Router {
    pub id: RouterId,
    pub protocol: Protocol,
    state: RouterState,
    lsdb: LinkStateDatabase,
    routing_table: RoutingTable,
    table_stale: bool,
    links: Vec<LinkId>,
    sequence: u64,
    last_origination: u64,
    advertised: BTreeMap<RouterId, LinkAdvert>,
    idle_ticks: u64,
    busy_this_tick: bool,
    transitions_this_tick: u64,
    cost: Arc<dyn CostStrategy>,
    sleep: Arc<dyn SleepPolicy>,
    pub stats: RouterStats,
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("id", &self.id)
            .field("protocol", &self.protocol)
            .field("state", &self.state)
            .field("sequence", &self.sequence)
            .field("lsdb_size", &self.lsdb.len())
            .field("routes", &self.routing_table.len())
            .field("table_stale", &self.table_stale)
            .finish()
    }
}

impl Router {
    pub fn new(
        id: RouterId,
        protocol: Protocol,
        links: Vec<LinkId>,
        cost: Arc<dyn CostStrategy>,
        sleep: Arc<dyn SleepPolicy>,
    ) -> Self {
        Self {
            id,
            protocol,
            state: RouterState::Active,
            lsdb: LinkStateDatabase::new(id),
            routing_table: RoutingTable::new(),
            table_stale: true,
            links,
            sequence: 0,
            last_origination: 0,
            advertised: BTreeMap::new(),
            idle_ticks: 0,
            busy_this_tick: false,
            transitions_this_tick: 0,
            cost,
            sleep,
            stats: RouterStats::default(),
        }
    }

    pub fn state(&self) -> RouterState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == RouterState::Active
    }

    pub fn links(&self) -> &[LinkId] {
        &self.links
    }

    pub fn lsdb(&self) -> &LinkStateDatabase {
        &self.lsdb
    }

    pub fn routing_table(&self) -> &RoutingTable {
        &self.routing_table
    }

    pub fn table_stale(&self) -> bool {
        self.table_stale
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Recomputes the advertisement for the incident links. Returns true when
    /// a neighbor appeared or vanished, a dormant flag flipped, or a cost moved
    /// by more than `epsilon`.
    pub fn refresh_adverts(&mut self, views: &[LinkView], epsilon: f64) -> bool {
        let fresh: BTreeMap<RouterId, LinkAdvert> = views
            .iter()
            .map(|view| {
                let advert = LinkAdvert {
                    neighbor: view.neighbor,
                    cost: self.cost.link_cost(view.bandwidth, view.load),
                    dormant: view.dormant,
                };
                (view.neighbor, advert)
            })
            .collect();

        let changed = fresh.len() != self.advertised.len()
            || fresh.iter().any(|(neighbor, advert)| match self.advertised.get(neighbor) {
                Some(old) => old.dormant != advert.dormant || cost_moved(old.cost, advert.cost, epsilon),
                None => true,
            });

        if changed {
            self.advertised = fresh;
        }
        changed
    }

    /// Issues a new LSA from the current advertisement, installs it locally
    /// and returns it for flooding.
    pub fn originate(&mut self, now: u64) -> Outgoing {
        self.sequence += 1;
        self.last_origination = now;
        self.stats.lsas_originated += 1;

        let lsa = LsaMessage {
            origin: self.id,
            sequence: self.sequence,
            age: 0,
            links: self.advertised.values().cloned().collect(),
        };
        debug!("Router {} originates LSA seq {} ({} links)", self.id, lsa.sequence, lsa.links.len());

        self.lsdb.install(lsa.clone());
        self.table_stale = true;
        Outgoing {
            target: Target::Flood { except: None },
            packet: Packet::Lsa(lsa),
        }
    }

    pub fn needs_refresh(&self, now: u64, interval: u64) -> bool {
        self.is_active() && now.saturating_sub(self.last_origination) >= interval
    }

    pub fn receive(&mut self, from: RouterId, packet: Packet, max_age: u64) -> (ReceiveOutcome, Vec<Outgoing>) {
        match self.state {
            RouterState::Sleeping => {
                if let Packet::Probe(probe) = &packet {
                    if probe.wake {
                        self.stats.probes_received += 1;
                        self.begin_wake();
                        return (ReceiveOutcome::Woken, Vec::new());
                    }
                }
                (ReceiveOutcome::Ignored, Vec::new())
            }
            RouterState::Waking => (ReceiveOutcome::Ignored, Vec::new()),
            RouterState::Active => match packet {
                Packet::Lsa(lsa) => self.handle_lsa(from, lsa, max_age),
                Packet::Hello(hello) => self.handle_hello(hello),
                Packet::Probe(probe) => {
                    self.stats.probes_received += 1;
                    if !probe.wake {
                        self.stats.traffic_received += probe.volume;
                    }
                    (ReceiveOutcome::ProbeAnswered, Vec::new())
                }
            },
        }
    }

    fn handle_lsa(&mut self, from: RouterId, lsa: LsaMessage, max_age: u64) -> (ReceiveOutcome, Vec<Outgoing>) {
        if lsa.origin == self.id || lsa.age > max_age {
            self.stats.lsas_discarded += 1;
            return (ReceiveOutcome::LsaDiscarded, Vec::new());
        }

        match self.lsdb.install(lsa.clone()) {
            InstallResult::Installed => {
                self.stats.lsas_accepted += 1;
                self.table_stale = true;
                let flood = Outgoing {
                    target: Target::Flood { except: Some(from) },
                    packet: Packet::Lsa(lsa),
                };
                (ReceiveOutcome::LsaInstalled, vec![flood])
            }
            InstallResult::Stale => {
                self.stats.lsas_discarded += 1;
                (ReceiveOutcome::LsaDiscarded, Vec::new())
            }
        }
    }

    /// A neighbor (re)joined: hand it every LSA we hold.
    fn handle_hello(&mut self, hello: HelloMessage) -> (ReceiveOutcome, Vec<Outgoing>) {
        self.stats.hellos_received += 1;
        let sync = self
            .lsdb
            .iter()
            .map(|lsa| Outgoing {
                target: Target::Neighbor(hello.router_id),
                packet: Packet::Lsa(lsa.clone()),
            })
            .collect();
        (ReceiveOutcome::HelloAnswered, sync)
    }

    pub fn hello(&self, target: Target) -> Outgoing {
        Outgoing {
            target,
            packet: Packet::Hello(HelloMessage {
                router_id: self.id,
                sequence: self.sequence,
            }),
        }
    }

    fn begin_wake(&mut self) {
        info!("Router {} waking up", self.id);
        self.state = RouterState::Waking;
        self.idle_ticks = 0;
        self.transitions_this_tick += 1;
    }

    /// Local traffic arrived while sleeping. Returns true if a wake started.
    pub fn wake(&mut self) -> bool {
        if self.state != RouterState::Sleeping {
            return false;
        }
        self.begin_wake();
        true
    }

    /// Waking -> Active: re-originate with the current link views and greet
    /// the neighbors so they resynchronise our database.
    pub fn complete_wake(&mut self, now: u64, views: &[LinkView], epsilon: f64) -> Vec<Outgoing> {
        if self.state != RouterState::Waking {
            return Vec::new();
        }
        self.state = RouterState::Active;
        self.refresh_adverts(views, epsilon);
        let lsa = self.originate(now);
        vec![lsa, self.hello(Target::Flood { except: None })]
    }

    /// Ages the database. Sleeping routers keep theirs frozen.
    pub fn age_database(&mut self, max_age: u64) {
        if !self.is_active() {
            return;
        }
        if !self.lsdb.age(max_age).is_empty() {
            self.table_stale = true;
        }
    }

    /// Rebuilds the routing table if stale. The new table is computed
    /// completely before it replaces the committed one.
    pub fn recompute(&mut self) -> bool {
        if !self.is_active() || !self.table_stale {
            return false;
        }
        let table = compute_routes(&Graph::from_lsdb(&self.lsdb), self.id);
        self.table_stale = false;
        if table == self.routing_table {
            return false;
        }
        debug!("Router {} routing table updated with {} routes", self.id, table.len());
        self.routing_table = table;
        true
    }

    /// Holding traffic, even while it waits, keeps a router awake.
    pub fn note_busy(&mut self) {
        self.busy_this_tick = true;
    }

    pub fn note_originated(&mut self) {
        self.busy_this_tick = true;
        self.stats.traffic_originated += 1;
    }

    pub fn note_forwarded(&mut self) {
        self.busy_this_tick = true;
        self.stats.traffic_forwarded += 1;
    }

    pub fn note_grafts(&mut self, links: u64) {
        self.stats.grafts += links;
    }

    pub fn note_unreachable(&mut self, dst: RouterId) {
        self.stats.unreachable_drops += 1;
        warn!("Router {} has no route to {}, traffic dropped", self.id, dst);
    }

    /// Charges the tick's energy and applies the sleep policy. A router may
    /// only sleep once all incident links sleep and it moved no traffic.
    pub fn end_tick(&mut self, all_links_sleeping: bool, config: &SimConfig) -> bool {
        if self.state == RouterState::Sleeping {
            self.stats.sleeping_ticks += 1;
        } else {
            self.stats.energy += config.active_node_cost;
        }

        let mut fell_asleep = false;
        if self.state == RouterState::Active && self.sleep.sleeps() {
            if all_links_sleeping && !self.busy_this_tick {
                self.idle_ticks += 1;
            } else {
                self.idle_ticks = 0;
            }
            if self.sleep.dwell_elapsed(self.idle_ticks) {
                info!("Router {} going to sleep", self.id);
                self.state = RouterState::Sleeping;
                self.idle_ticks = 0;
                self.transitions_this_tick += 1;
                fell_asleep = true;
            }
        }

        self.stats.transitions += self.transitions_this_tick;
        self.stats.energy += config.transition_cost * self.transitions_this_tick as f64;
        self.transitions_this_tick = 0;
        self.busy_this_tick = false;
        fell_asleep
    }
}

fn cost_moved(old: f64, new: f64, epsilon: f64) -> bool {
    match (old.is_finite(), new.is_finite()) {
        (true, true) => (old - new).abs() > epsilon,
        (false, false) => false,
        _ => true,
    }
}
