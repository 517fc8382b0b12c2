pub mod link;
pub mod snapshot;
pub mod traffic;

pub use crate::config::{LinkSpec, Topology};
pub use link::{Link, LinkState, LinkStats, LinkTick};
pub use snapshot::{LinkSnapshot, RouterSnapshot, Sample, Snapshot};
pub use traffic::{DropReason, DropRecord, Flow, TrafficGenerator, TrafficMetrics};

use chrono::Utc;
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Arc;
use uuid::Uuid;

use crate::algorithms::dijkstra::{compute_routes, Graph};
use crate::config::SimConfig;
use crate::error::{Result, SimError};
use crate::protocol::{CostStrategy, Packet, ProbeMessage, Protocol, RoutingTable, SleepPolicy};
use crate::router::{LinkView, Outgoing, ReceiveOutcome, Router, RouterState, Target};
use crate::{LinkId, RouterId};

#[derive(Debug, Clone)]
struct Envelope {
    to: RouterId,
    from: RouterId,
    packet: Packet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Convergence {
    Converged { ticks: u64 },
    NotConverged { ticks: u64 },
}

impl Convergence {
    pub fn is_converged(&self) -> bool {
        matches!(self, Convergence::Converged { .. })
    }

    pub fn ticks(&self) -> u64 {
        match self {
            Convergence::Converged { ticks } | Convergence::NotConverged { ticks } => *ticks,
        }
    }
}

enum FlowStep {
    Moved,
    Wait,
    Delivered,
    Dropped(DropReason),
}

fn pair_key(a: RouterId, b: RouterId) -> (RouterId, RouterId) {
    if a <= b { (a, b) } else { (b, a) }
}

/// Discrete-time simulation of one routing protocol over a fixed topology.
///
/// Routers and links live in arenas and refer to each other by id. All
/// mutation happens inside [`Network::tick_once`]; everything else is a read.
#[derive(Debug)]
pub struct Network {
    run_id: Uuid,
    protocol: Protocol,
    config: SimConfig,
    time: u64,
    routers: BTreeMap<RouterId, Router>,
    links: Vec<Link>,
    link_index: BTreeMap<(RouterId, RouterId), LinkId>,
    cost: Arc<dyn CostStrategy>,
    sleep: Arc<dyn SleepPolicy>,
    pending: Vec<Envelope>,
    flows: VecDeque<Flow>,
    next_flow_id: u64,
    generator: TrafficGenerator,
    metrics: TrafficMetrics,
    samples: Vec<Sample>,
    last_sample: (u64, f64),
}

impl Network {
    /// Validates the topology, creates every router in the Active state and
    /// queues their initial LSAs.
    pub fn new(topology: &Topology, protocol: Protocol, config: SimConfig) -> Result<Self> {
        config.validate()?;

        let mut router_ids = BTreeSet::new();
        for &id in &topology.routers {
            if !router_ids.insert(id) {
                return Err(SimError::InvalidTopology(format!("duplicate router {}", id)));
            }
        }

        let mut links = Vec::with_capacity(topology.links.len());
        let mut link_index = BTreeMap::new();
        let mut incident: BTreeMap<RouterId, Vec<LinkId>> =
            router_ids.iter().map(|&id| (id, Vec::new())).collect();

        for spec in &topology.links {
            if spec.a == spec.b {
                return Err(SimError::InvalidTopology(format!("self-loop on router {}", spec.a)));
            }
            for end in [spec.a, spec.b] {
                if !router_ids.contains(&end) {
                    return Err(SimError::InvalidTopology(format!(
                        "link {}-{} references unknown router {}",
                        spec.a, spec.b, end
                    )));
                }
            }
            let id = links.len();
            if link_index.insert(pair_key(spec.a, spec.b), id).is_some() {
                return Err(SimError::InvalidTopology(format!("duplicate link {}-{}", spec.a, spec.b)));
            }
            if !(spec.bandwidth > 0.0) {
                warn!(
                    "Link {}-{} has non-positive bandwidth {}, it will never be selected",
                    spec.a, spec.b, spec.bandwidth
                );
            }
            incident.entry(spec.a).or_default().push(id);
            incident.entry(spec.b).or_default().push(id);
            links.push(Link::new(id, spec));
        }

        let cost = protocol.cost_strategy(&config);
        let sleep = protocol.sleep_policy(&config);
        let routers = incident
            .into_iter()
            .map(|(id, link_ids)| (id, Router::new(id, protocol, link_ids, cost.clone(), sleep.clone())))
            .collect();

        let mut network = Self {
            run_id: Uuid::new_v4(),
            protocol,
            generator: TrafficGenerator::new(config.random_seed),
            config,
            time: 0,
            routers,
            links,
            link_index,
            cost,
            sleep,
            pending: Vec::new(),
            flows: VecDeque::new(),
            next_flow_id: 0,
            metrics: TrafficMetrics::default(),
            samples: Vec::new(),
            last_sample: (0, 0.0),
        };

        let epsilon = network.config.cost_epsilon;
        for id in router_ids {
            let views = network.link_views(id);
            let Some(router) = network.routers.get_mut(&id) else {
                continue;
            };
            router.refresh_adverts(&views, epsilon);
            let lsa = router.originate(0);
            network.send(id, vec![lsa]);
        }

        info!(
            "Built {} network {} with {} routers and {} links",
            protocol,
            network.run_id,
            network.routers.len(),
            network.links.len()
        );
        Ok(network)
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn time(&self) -> u64 {
        self.time
    }

    pub fn router(&self, id: RouterId) -> Option<&Router> {
        self.routers.get(&id)
    }

    pub fn routers(&self) -> impl Iterator<Item = &Router> {
        self.routers.values()
    }

    pub fn router_ids(&self) -> Vec<RouterId> {
        self.routers.keys().copied().collect()
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    fn link_id_between(&self, a: RouterId, b: RouterId) -> Option<LinkId> {
        self.link_index.get(&pair_key(a, b)).copied()
    }

    pub fn link_between(&self, a: RouterId, b: RouterId) -> Option<&Link> {
        self.link_id_between(a, b).map(|id| &self.links[id])
    }

    pub fn metrics(&self) -> &TrafficMetrics {
        &self.metrics
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn pending_packets(&self) -> usize {
        self.pending.len()
    }

    pub fn in_flight(&self) -> usize {
        self.flows.len()
    }

    pub fn total_energy(&self) -> f64 {
        let routers: f64 = self.routers.values().map(|r| r.stats.energy).sum();
        let links: f64 = self.links.iter().map(|l| l.stats.energy).sum();
        routers + links
    }

    /// Queues a flow at `src`. It starts moving on the next tick.
    pub fn inject_traffic(&mut self, src: RouterId, dst: RouterId, volume: f64) -> Result<u64> {
        for id in [src, dst] {
            if !self.routers.contains_key(&id) {
                return Err(SimError::UnknownRouter(id));
            }
        }
        if !(volume > 0.0 && volume.is_finite()) {
            return Err(SimError::InvalidTraffic(format!("volume {} must be positive", volume)));
        }

        let id = self.next_flow_id;
        self.next_flow_id += 1;
        self.flows.push_back(Flow {
            id,
            src,
            dst,
            volume,
            at: src,
            hops: 0,
            injected_at: self.time,
        });
        self.metrics.injected += 1;
        debug!("Flow {} injected: {} -> {} ({})", id, src, dst, volume);
        Ok(id)
    }

    /// Injects `count` demands drawn from the seeded generator.
    pub fn inject_random(&mut self, count: usize, max_volume: f64) -> Result<Vec<u64>> {
        let ids = self.router_ids();
        let mut injected = Vec::with_capacity(count);
        for _ in 0..count {
            let Some((src, dst, volume)) = self.generator.demand(&ids, max_volume) else {
                break;
            };
            injected.push(self.inject_traffic(src, dst, volume)?);
        }
        Ok(injected)
    }

    pub fn tick(&mut self, n: u64) {
        for _ in 0..n {
            self.tick_once();
        }
    }

    pub fn tick_once(&mut self) {
        self.time += 1;
        let now = self.time;

        self.complete_wakes(now);
        self.deliver_packets();
        self.age_and_refresh(now);
        for router in self.routers.values_mut() {
            router.recompute();
        }
        self.move_traffic(now);
        self.account(now);

        if now % self.config.poll_interval == 0 {
            let sample = self.current_sample();
            self.last_sample = (sample.time, sample.energy);
            self.samples.push(sample);
        }
    }

    /// No packets queued, no flows in flight and every active router's
    /// table computed from its current database.
    pub fn is_converged(&self) -> bool {
        self.pending.is_empty()
            && self.flows.is_empty()
            && self.routers.values().all(|r| !r.is_active() || !r.table_stale())
    }

    pub fn run_until_converged(&mut self, max_ticks: u64) -> Convergence {
        for ran in 0..max_ticks {
            if self.is_converged() {
                return Convergence::Converged { ticks: ran };
            }
            self.tick_once();
        }
        if self.is_converged() {
            Convergence::Converged { ticks: max_ticks }
        } else {
            warn!("Network {} did not converge within {} ticks", self.run_id, max_ticks);
            Convergence::NotConverged { ticks: max_ticks }
        }
    }

    fn link_views(&self, id: RouterId) -> Vec<LinkView> {
        let Some(router) = self.routers.get(&id) else {
            return Vec::new();
        };
        router
            .links()
            .iter()
            .filter_map(|&link_id| {
                let link = &self.links[link_id];
                link.other_end(id).map(|neighbor| LinkView {
                    neighbor,
                    bandwidth: link.bandwidth,
                    load: link.load_from(id),
                    dormant: !link.is_active(),
                })
            })
            .collect()
    }

    /// Queues a router's output for delivery on the next tick. Only active
    /// links carry protocol packets.
    fn send(&mut self, from: RouterId, outgoing: Vec<Outgoing>) {
        let Some(router) = self.routers.get(&from) else {
            return;
        };
        for Outgoing { target, packet } in outgoing {
            match target {
                Target::Flood { except } => {
                    for &link_id in router.links() {
                        let link = &self.links[link_id];
                        if !link.is_active() {
                            continue;
                        }
                        match link.other_end(from) {
                            Some(to) if Some(to) != except => self.pending.push(Envelope {
                                to,
                                from,
                                packet: packet.clone(),
                            }),
                            _ => {}
                        }
                    }
                }
                Target::Neighbor(to) => match self.link_id_between(from, to) {
                    Some(link_id) if self.links[link_id].is_active() => {
                        self.pending.push(Envelope { to, from, packet })
                    }
                    _ => debug!("Router {} cannot reach neighbor {}, {} dropped", from, to, packet.kind()),
                },
            }
        }
    }

    fn complete_wakes(&mut self, now: u64) {
        let mut woken = Vec::new();
        for link in &mut self.links {
            if link.complete_wake() {
                info!("Link {} ({}-{}) is active again", link.id, link.a, link.b);
                woken.push((link.a, link.b));
            }
        }
        for (a, b) in woken {
            for (from, to) in [(a, b), (b, a)] {
                let hello = match self.routers.get(&from) {
                    Some(router) if router.is_active() => router.hello(Target::Neighbor(to)),
                    _ => continue,
                };
                self.send(from, vec![hello]);
            }
        }

        let waking: Vec<RouterId> = self
            .routers
            .values()
            .filter(|r| r.state() == RouterState::Waking)
            .map(|r| r.id)
            .collect();
        let epsilon = self.config.cost_epsilon;
        for id in waking {
            let views = self.link_views(id);
            let Some(router) = self.routers.get_mut(&id) else {
                continue;
            };
            let outgoing = router.complete_wake(now, &views, epsilon);
            info!("Router {} is active again", id);
            self.send(id, outgoing);
        }
    }

    fn deliver_packets(&mut self) {
        let mut batch = std::mem::take(&mut self.pending);
        batch.sort_by_key(|e| (e.to, e.from, e.packet.origin(), e.packet.sequence()));

        let max_age = self.config.max_age;
        for Envelope { to, from, packet } in batch {
            let Some(router) = self.routers.get_mut(&to) else {
                continue;
            };
            let kind = packet.kind();
            let (outcome, outgoing) = router.receive(from, packet, max_age);
            if outcome == ReceiveOutcome::Ignored {
                debug!("Router {} ignored {} from {}", to, kind, from);
            }
            self.send(to, outgoing);
        }
    }

    fn age_and_refresh(&mut self, now: u64) {
        let max_age = self.config.max_age;
        let interval = self.config.lsa_refresh_interval;
        let epsilon = self.config.cost_epsilon;

        for id in self.router_ids() {
            let refresh = match self.routers.get_mut(&id) {
                Some(router) => {
                    router.age_database(max_age);
                    router.needs_refresh(now, interval)
                }
                None => continue,
            };
            if !refresh {
                continue;
            }
            let views = self.link_views(id);
            if let Some(router) = self.routers.get_mut(&id) {
                router.refresh_adverts(&views, epsilon);
                let lsa = router.originate(now);
                self.send(id, vec![lsa]);
            }
        }
    }

    fn move_traffic(&mut self, now: u64) {
        let flows = std::mem::take(&mut self.flows);
        for mut flow in flows {
            match self.step_flow(&mut flow) {
                FlowStep::Moved | FlowStep::Wait => self.flows.push_back(flow),
                FlowStep::Delivered => {
                    debug!("Flow {} delivered to {} after {} hops", flow.id, flow.dst, flow.hops);
                    self.metrics.record_delivery(&flow, now);
                }
                FlowStep::Dropped(reason) => {
                    warn!("Flow {} dropped at router {}: {:?}", flow.id, flow.at, reason);
                    self.metrics.record_drop(&flow, now, reason);
                }
            }
        }
    }

    /// Advances a flow by at most one hop. Sleeping routers and links on the
    /// way are woken and the flow waits for them.
    fn step_flow(&mut self, flow: &mut Flow) -> FlowStep {
        let at = flow.at;
        let router_count = self.routers.len();
        let max_age = self.config.max_age;

        let next = {
            let Some(router) = self.routers.get_mut(&at) else {
                return FlowStep::Dropped(DropReason::Unreachable);
            };
            match router.state() {
                RouterState::Sleeping => {
                    router.wake();
                    return FlowStep::Wait;
                }
                RouterState::Waking => return FlowStep::Wait,
                RouterState::Active => {}
            }
            router.note_busy();
            if at == flow.dst {
                return FlowStep::Delivered;
            }
            if flow.hops >= router_count {
                return FlowStep::Dropped(DropReason::HopLimit);
            }
            match router.routing_table().next_hop(flow.dst) {
                Some(next) => next,
                None => {
                    router.note_unreachable(flow.dst);
                    return FlowStep::Dropped(DropReason::Unreachable);
                }
            }
        };

        let Some(link_id) = self.link_id_between(at, next) else {
            return FlowStep::Dropped(DropReason::Unreachable);
        };

        let mut blocked = false;
        let link = &mut self.links[link_id];
        match link.state() {
            LinkState::Sleeping => {
                link.wake();
                info!("Traffic at {} wakes link {} ({}-{})", at, link.id, link.a, link.b);
                blocked = true;
            }
            LinkState::Waking => blocked = true,
            LinkState::Active => {}
        }

        let Some(neighbor) = self.routers.get_mut(&next) else {
            return FlowStep::Dropped(DropReason::Unreachable);
        };
        match neighbor.state() {
            RouterState::Sleeping => {
                let probe = Packet::Probe(ProbeMessage {
                    origin: flow.src,
                    sequence: flow.id,
                    volume: flow.volume,
                    wake: true,
                });
                neighbor.receive(at, probe, max_age);
                blocked = true;
            }
            RouterState::Waking => blocked = true,
            RouterState::Active => {}
        }
        if blocked {
            return FlowStep::Wait;
        }

        if !self.links[link_id].carry(at, flow.volume) {
            return FlowStep::Dropped(DropReason::Congestion);
        }
        if let Some(router) = self.routers.get_mut(&at) {
            if flow.hops == 0 {
                router.note_originated();
            } else {
                router.note_forwarded();
            }
        }
        flow.at = next;
        flow.hops += 1;

        let Some(neighbor) = self.routers.get_mut(&next) else {
            return FlowStep::Dropped(DropReason::Unreachable);
        };
        neighbor.note_busy();
        if next == flow.dst {
            let delivery = Packet::Probe(ProbeMessage {
                origin: flow.src,
                sequence: flow.id,
                volume: flow.volume,
                wake: false,
            });
            neighbor.receive(at, delivery, max_age);
            return FlowStep::Delivered;
        }
        FlowStep::Moved
    }

    fn account(&mut self, now: u64) {
        for link in &mut self.links {
            if link.end_tick(&self.config, self.sleep.as_ref()) == LinkTick::FellAsleep {
                info!("Link {} ({}-{}) going to sleep", link.id, link.a, link.b);
            }
        }
        self.graft_overloaded();

        let epsilon = self.config.cost_epsilon;
        let ids = self.router_ids();
        for &id in &ids {
            if !self.routers.get(&id).is_some_and(Router::is_active) {
                continue;
            }
            let views = self.link_views(id);
            if let Some(router) = self.routers.get_mut(&id) {
                if router.refresh_adverts(&views, epsilon) {
                    let lsa = router.originate(now);
                    self.send(id, vec![lsa]);
                }
            }
        }

        for id in ids {
            let all_links_sleeping = self.routers.get(&id).is_some_and(|router| {
                router
                    .links()
                    .iter()
                    .all(|&link_id| self.links[link_id].state() == LinkState::Sleeping)
            });
            if let Some(router) = self.routers.get_mut(&id) {
                router.end_tick(all_links_sleeping, &self.config);
            }
        }
    }

    /// A router pushing an incident link past the upper threshold restores
    /// every sleeping link it owns, waking sleeping routers at the far end.
    fn graft_overloaded(&mut self) {
        let overloaded: Vec<RouterId> = self
            .routers
            .iter()
            .filter(|(_, router)| router.is_active())
            .filter(|&(&id, router)| {
                router.links().iter().any(|&link_id| {
                    let link = &self.links[link_id];
                    link.is_active() && self.sleep.is_overloaded(link.load_from(id), link.bandwidth)
                })
            })
            .map(|(&id, _)| id)
            .collect();

        for id in overloaded {
            let link_ids = match self.routers.get(&id) {
                Some(router) => router.links().to_vec(),
                None => continue,
            };
            let mut restored = 0;
            for link_id in link_ids {
                let link = &mut self.links[link_id];
                if !link.wake() {
                    continue;
                }
                restored += 1;
                info!("Router {} grafts link {} ({}-{}) under load", id, link.id, link.a, link.b);
                if let Some(neighbor) = link.other_end(id).and_then(|far| self.routers.get_mut(&far)) {
                    neighbor.wake();
                }
            }
            if restored > 0 {
                if let Some(router) = self.routers.get_mut(&id) {
                    router.note_grafts(restored);
                }
            }
        }
    }

    /// Network-wide counters at the current time. Reads only.
    pub fn current_sample(&self) -> Sample {
        let energy = self.total_energy();
        let (last_time, last_energy) = self.last_sample;
        let elapsed = self.time.saturating_sub(last_time);
        Sample {
            time: self.time,
            energy,
            power: if elapsed > 0 { (energy - last_energy) / elapsed as f64 } else { 0.0 },
            delivered: self.metrics.delivered,
            dropped: self.metrics.dropped(),
            active_links: self.links.iter().filter(|l| l.is_active()).count(),
            active_routers: self.routers.values().filter(|r| r.is_active()).count(),
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            run_id: self.run_id,
            taken_at: Utc::now(),
            protocol: self.protocol,
            time: self.time,
            total_energy: self.total_energy(),
            pending_packets: self.pending.len(),
            in_flight: self.flows.len(),
            routers: self
                .routers
                .values()
                .map(|router| RouterSnapshot {
                    id: router.id,
                    state: router.state(),
                    sequence: router.sequence(),
                    lsdb_size: router.lsdb().len(),
                    routes: router.routing_table().iter().map(|(_, entry)| entry.clone()).collect(),
                    stats: router.stats.clone(),
                })
                .collect(),
            links: self
                .links
                .iter()
                .map(|link| LinkSnapshot {
                    id: link.id,
                    a: link.a,
                    b: link.b,
                    bandwidth: link.bandwidth,
                    state: link.state(),
                    load: [link.load_from(link.a), link.load_from(link.b)],
                    stats: link.stats.clone(),
                })
                .collect(),
            traffic: self.metrics.clone(),
        }
    }

    /// Follows committed next hops from `src` to `dst`.
    pub fn path(&self, src: RouterId, dst: RouterId) -> Result<Vec<RouterId>> {
        for id in [src, dst] {
            if !self.routers.contains_key(&id) {
                return Err(SimError::UnknownRouter(id));
            }
        }
        let mut path = vec![src];
        let mut at = src;
        while at != dst {
            let next = self
                .routers
                .get(&at)
                .and_then(|router| router.routing_table().next_hop(dst))
                .ok_or(SimError::UnreachableDestination { src, dst })?;
            if path.len() > self.routers.len() {
                return Err(SimError::UnreachableDestination { src, dst });
            }
            path.push(next);
            at = next;
        }
        Ok(path)
    }

    /// Routing table `source` should converge to: SPF over the true link
    /// costs and states, independent of any router's database.
    pub fn reference_routes(&self, source: RouterId) -> Result<RoutingTable> {
        if !self.routers.contains_key(&source) {
            return Err(SimError::UnknownRouter(source));
        }
        let mut graph = Graph::new();
        for &id in self.routers.keys() {
            graph.add_node(id);
        }
        for link in &self.links {
            for (from, to) in [(link.a, link.b), (link.b, link.a)] {
                let cost = self.cost.link_cost(link.bandwidth, link.load_from(from));
                graph.add_edge(from, to, cost, !link.is_active());
            }
        }
        Ok(compute_routes(&graph, source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(bandwidth: f64) -> Topology {
        let mut topology = Topology::new();
        topology.add_router(1).add_router(2).add_link(1, 2, bandwidth);
        topology
    }

    fn invalid(topology: &Topology) -> bool {
        matches!(
            Network::new(topology, Protocol::Ospf, SimConfig::default()),
            Err(SimError::InvalidTopology(_))
        )
    }

    #[test]
    fn malformed_topologies_are_rejected() {
        let mut duplicate_router = line(10.0);
        duplicate_router.add_router(1);
        assert!(invalid(&duplicate_router));

        let mut self_loop = line(10.0);
        self_loop.add_link(2, 2, 10.0);
        assert!(invalid(&self_loop));

        let mut dangling = line(10.0);
        dangling.add_link(1, 9, 10.0);
        assert!(invalid(&dangling));

        let mut reversed_duplicate = line(10.0);
        reversed_duplicate.add_link(2, 1, 10.0);
        assert!(invalid(&reversed_duplicate));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = SimConfig { poll_interval: 0, ..SimConfig::default() };
        let result = Network::new(&line(10.0), Protocol::Ospf, config);
        assert!(matches!(result, Err(SimError::InvalidConfig(_))));
    }

    #[test]
    fn construction_queues_initial_lsas() {
        let network = Network::new(&Topology::ring(4, 100.0), Protocol::Ospf, SimConfig::default()).unwrap();
        assert_eq!(network.time(), 0);
        assert_eq!(network.pending_packets(), 8);
        assert!(network.routers().all(|r| r.sequence() == 1));
    }

    #[test]
    fn injection_validates_endpoints_and_volume() {
        let mut network = Network::new(&line(10.0), Protocol::Ospf, SimConfig::default()).unwrap();
        assert!(matches!(network.inject_traffic(1, 7, 1.0), Err(SimError::UnknownRouter(7))));
        assert!(matches!(network.inject_traffic(1, 2, 0.0), Err(SimError::InvalidTraffic(_))));
        assert!(matches!(network.inject_traffic(1, 2, f64::NAN), Err(SimError::InvalidTraffic(_))));
        assert_eq!(network.inject_traffic(1, 2, 1.0).unwrap(), 0);
        assert_eq!(network.in_flight(), 1);
    }

    #[test]
    fn zero_bandwidth_link_is_routed_around() {
        let mut topology = Topology::new();
        topology
            .add_router(1)
            .add_router(2)
            .add_router(3)
            .add_link(1, 2, 0.0)
            .add_link(1, 3, 100.0)
            .add_link(3, 2, 100.0);
        let mut network = Network::new(&topology, Protocol::Ospf, SimConfig::default()).unwrap();
        assert!(network.run_until_converged(20).is_converged());

        assert_eq!(network.path(1, 2).unwrap(), vec![1, 3, 2]);
        let route = network.router(1).unwrap().routing_table().get_route(2).unwrap();
        assert_eq!(route.cost, 2.0);
    }

    #[test]
    fn congestion_drops_excess_volume() {
        let mut network = Network::new(&line(10.0), Protocol::Ospf, SimConfig::default()).unwrap();
        network.run_until_converged(20);
        network.inject_traffic(1, 2, 8.0).unwrap();
        network.inject_traffic(1, 2, 8.0).unwrap();
        network.tick_once();

        assert_eq!(network.metrics().delivered, 1);
        assert_eq!(network.metrics().dropped_by(DropReason::Congestion), 1);
        assert_eq!(network.link_between(2, 1).unwrap().stats.dropped_packets, 1);
        assert_eq!(network.router(2).unwrap().stats.traffic_received, 8.0);
    }

    #[test]
    fn missing_route_counts_as_unreachable() {
        let mut topology = line(10.0);
        topology.add_router(3);
        let mut network = Network::new(&topology, Protocol::Ospf, SimConfig::default()).unwrap();
        network.run_until_converged(20);

        network.inject_traffic(1, 3, 1.0).unwrap();
        network.tick_once();
        assert_eq!(network.metrics().dropped_by(DropReason::Unreachable), 1);
        assert_eq!(network.router(1).unwrap().stats.unreachable_drops, 1);
        assert!(matches!(
            network.path(1, 3),
            Err(SimError::UnreachableDestination { src: 1, dst: 3 })
        ));
    }

    #[test]
    fn samples_follow_poll_interval() {
        let config = SimConfig { poll_interval: 2, ..SimConfig::default() };
        let mut network = Network::new(&Topology::ring(4, 100.0), Protocol::Ospf, config).unwrap();
        network.tick(6);

        let times: Vec<u64> = network.samples().iter().map(|s| s.time).collect();
        assert_eq!(times, vec![2, 4, 6]);
        // 4 routers at 20 plus 4 links at 10 per tick
        assert_eq!(network.samples()[0].power, 120.0);
        assert_eq!(network.samples()[2].energy, 720.0);
        assert_eq!(network.samples()[2].active_links, 4);
    }

    #[test]
    fn snapshot_serializes_to_json() {
        let mut network = Network::new(&Topology::ring(3, 100.0), Protocol::Gospf, SimConfig::default()).unwrap();
        network.tick(3);
        let snapshot = network.snapshot();
        assert_eq!(snapshot.routers.len(), 3);
        assert_eq!(snapshot.links.len(), 3);

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["protocol"], "gospf");
        assert_eq!(json["time"], 3);
        assert_eq!(json["run_id"], network.run_id().to_string());
    }
}
