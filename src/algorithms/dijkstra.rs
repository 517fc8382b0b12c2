use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};

use crate::protocol::{LinkStateDatabase, RoutingEntry, RoutingTable};
use crate::RouterId;

#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub to: RouterId,
    pub cost: f64,
    pub dormant: bool,
}

/// Directed cost graph handed to SPF.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: BTreeSet<RouterId>,
    edges: BTreeMap<RouterId, Vec<Edge>>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: RouterId) {
        self.nodes.insert(node);
    }

    /// Edges with a non-finite cost are never usable and are dropped here.
    pub fn add_edge(&mut self, from: RouterId, to: RouterId, cost: f64, dormant: bool) {
        self.nodes.insert(from);
        self.nodes.insert(to);
        if !cost.is_finite() {
            return;
        }
        self.edges
            .entry(from)
            .or_default()
            .push(Edge { to, cost, dormant });
    }

    pub fn contains(&self, node: RouterId) -> bool {
        self.nodes.contains(&node)
    }

    pub fn neighbors(&self, node: RouterId) -> &[Edge] {
        self.edges.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Graph implied by a link-state database. Nodes are routers with a known
    /// LSA; `u -> v` exists only when `v` advertises `u` back. An edge is
    /// dormant when either side reports it sleeping.
    pub fn from_lsdb(lsdb: &LinkStateDatabase) -> Self {
        let mut graph = Graph::new();
        for lsa in lsdb.iter() {
            graph.add_node(lsa.origin);
        }
        for lsa in lsdb.iter() {
            for advert in &lsa.links {
                let Some(reverse) = lsdb.get(advert.neighbor).and_then(|n| n.advert_for(lsa.origin)) else {
                    continue;
                };
                graph.add_edge(
                    lsa.origin,
                    advert.neighbor,
                    advert.cost,
                    advert.dormant || reverse.dormant,
                );
            }
        }
        graph
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShortestPath {
    pub cost: f64,
    pub next_hop: RouterId,
}

#[derive(Debug)]
struct State {
    cost: f64,
    first_hop: RouterId,
    router: RouterId,
}

impl Eq for State {}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.first_hop.cmp(&self.first_hop))
            .then_with(|| other.router.cmp(&self.router))
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn better(cost: f64, first_hop: RouterId, than: &ShortestPath) -> bool {
    match cost.total_cmp(&than.cost) {
        Ordering::Less => true,
        Ordering::Equal => first_hop < than.next_hop,
        Ordering::Greater => false,
    }
}

/// Single-source Dijkstra. Equal-cost paths resolve to the lowest first-hop
/// neighbor id. Dormant edges are skipped unless `include_dormant` is set.
pub fn shortest_paths(
    graph: &Graph,
    source: RouterId,
    include_dormant: bool,
) -> BTreeMap<RouterId, ShortestPath> {
    let mut best: BTreeMap<RouterId, ShortestPath> = BTreeMap::new();
    let mut settled: BTreeSet<RouterId> = BTreeSet::new();
    let mut heap = BinaryHeap::new();

    if !graph.contains(source) {
        return best;
    }
    settled.insert(source);

    for edge in graph.neighbors(source) {
        if edge.dormant && !include_dormant {
            continue;
        }
        relax(&mut best, &mut heap, edge.to, edge.cost, edge.to, source);
    }

    while let Some(State { cost, first_hop, router }) = heap.pop() {
        if settled.contains(&router) {
            continue;
        }
        match best.get(&router) {
            Some(path) if path.cost == cost && path.next_hop == first_hop => {}
            _ => continue,
        }
        settled.insert(router);

        for edge in graph.neighbors(router) {
            if (edge.dormant && !include_dormant) || settled.contains(&edge.to) {
                continue;
            }
            relax(&mut best, &mut heap, edge.to, cost + edge.cost, first_hop, source);
        }
    }

    best
}

fn relax(
    best: &mut BTreeMap<RouterId, ShortestPath>,
    heap: &mut BinaryHeap<State>,
    router: RouterId,
    cost: f64,
    first_hop: RouterId,
    source: RouterId,
) {
    if router == source {
        return;
    }
    let improves = best
        .get(&router)
        .map_or(true, |current| better(cost, first_hop, current));
    if improves {
        best.insert(router, ShortestPath { cost, next_hop: first_hop });
        heap.push(State { cost, first_hop, router });
    }
}

/// Routing table for `source`: live paths first, then dormant fallbacks for
/// destinations only reachable across sleeping links.
pub fn compute_routes(graph: &Graph, source: RouterId) -> RoutingTable {
    let live = shortest_paths(graph, source, false);
    let full = shortest_paths(graph, source, true);

    let live_entries = live.iter().map(|(&destination, path)| RoutingEntry {
        destination,
        next_hop: path.next_hop,
        cost: path.cost,
        dormant: false,
    });
    let dormant_entries = full
        .iter()
        .filter(|(destination, _)| !live.contains_key(destination))
        .map(|(&destination, path)| RoutingEntry {
            destination,
            next_hop: path.next_hop,
            cost: path.cost,
            dormant: true,
        });

    RoutingTable::from_entries(live_entries.chain(dormant_entries))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn undirected(edges: &[(RouterId, RouterId, f64)]) -> Graph {
        let mut graph = Graph::new();
        for &(a, b, cost) in edges {
            graph.add_edge(a, b, cost, false);
            graph.add_edge(b, a, cost, false);
        }
        graph
    }

    #[test]
    fn ring_tie_breaks_on_lowest_first_hop() {
        let graph = undirected(&[(1, 2, 1.0), (2, 3, 1.0), (3, 4, 1.0), (4, 1, 1.0)]);
        let paths = shortest_paths(&graph, 1, false);

        assert_eq!(paths[&3], ShortestPath { cost: 2.0, next_hop: 2 });
        assert_eq!(paths[&4], ShortestPath { cost: 1.0, next_hop: 4 });
        assert!(!paths.contains_key(&1));
    }

    #[test]
    fn tie_break_applies_beyond_the_first_hop() {
        // 1 -> 5 via 3 or via 2, both cost 3; 2 must win.
        let graph = undirected(&[(1, 3, 1.0), (3, 4, 1.0), (4, 5, 1.0), (1, 2, 2.0), (2, 5, 1.0)]);
        let paths = shortest_paths(&graph, 1, false);
        assert_eq!(paths[&5], ShortestPath { cost: 3.0, next_hop: 2 });
    }

    #[test]
    fn cheaper_long_path_beats_short_expensive_one() {
        let graph = undirected(&[(1, 2, 10.0), (1, 3, 1.0), (3, 2, 1.0)]);
        let paths = shortest_paths(&graph, 1, false);
        assert_eq!(paths[&2], ShortestPath { cost: 2.0, next_hop: 3 });
    }

    #[test]
    fn infinite_edges_are_unusable() {
        let mut graph = Graph::new();
        graph.add_edge(1, 2, f64::INFINITY, false);
        graph.add_edge(2, 1, f64::INFINITY, false);
        assert!(shortest_paths(&graph, 1, true).is_empty());
        assert!(graph.contains(2));
    }

    #[test]
    fn dormant_edges_only_serve_as_fallback() {
        let mut graph = Graph::new();
        for (a, b, dormant) in [(1, 2, false), (2, 3, true), (1, 3, false)] {
            graph.add_edge(a, b, 1.0, dormant);
            graph.add_edge(b, a, 1.0, dormant);
        }
        graph.add_edge(3, 4, 1.0, true);
        graph.add_edge(4, 3, 1.0, true);

        let table = compute_routes(&graph, 1);
        let to_three = table.get_route(3).unwrap();
        assert_eq!((to_three.next_hop, to_three.dormant), (3, false));
        let to_four = table.get_route(4).unwrap();
        assert_eq!((to_four.next_hop, to_four.cost, to_four.dormant), (3, 2.0, true));
    }

    #[test]
    fn lsdb_graph_requires_two_way_adverts() {
        use crate::protocol::{LinkAdvert, LsaMessage};

        let mut db = LinkStateDatabase::new(1);
        let advert = |neighbor| LinkAdvert { neighbor, cost: 1.0, dormant: false };
        db.install(LsaMessage { origin: 1, sequence: 1, age: 0, links: vec![advert(2), advert(3)] });
        db.install(LsaMessage { origin: 2, sequence: 1, age: 0, links: vec![advert(1)] });

        let graph = Graph::from_lsdb(&db);
        let paths = shortest_paths(&graph, 1, true);
        assert!(paths.contains_key(&2));
        assert!(!paths.contains_key(&3));
    }
}
