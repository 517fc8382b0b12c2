use eco_ospf_sim::config::{SimConfig, Topology};
use eco_ospf_sim::network::LinkState;
use eco_ospf_sim::protocol::Protocol;
use eco_ospf_sim::{build_network, Network, RouterState, SimError};

fn grid(width: u32, height: u32) -> Topology {
    let mut topology = Topology::new();
    let id = |x: u32, y: u32| y * width + x + 1;
    for y in 0..height {
        for x in 0..width {
            topology.add_router(id(x, y));
        }
    }
    let bandwidths = [100.0, 50.0, 25.0, 10.0];
    let mut n = 0;
    for y in 0..height {
        for x in 0..width {
            if x + 1 < width {
                topology.add_link(id(x, y), id(x + 1, y), bandwidths[n % bandwidths.len()]);
                n += 1;
            }
            if y + 1 < height {
                topology.add_link(id(x, y), id(x, y + 1), bandwidths[(n * 3) % bandwidths.len()]);
                n += 1;
            }
        }
    }
    topology
}

fn mixed_ring() -> Topology {
    let mut topology = Topology::ring(6, 100.0);
    topology.links[2].bandwidth = 10.0;
    topology.links[4].bandwidth = 25.0;
    topology.add_link(1, 4, 50.0);
    topology
}

fn two_islands() -> Topology {
    let mut topology = Topology::new();
    for id in 1..=5 {
        topology.add_router(id);
    }
    topology.add_link(1, 2, 100.0).add_link(2, 3, 50.0).add_link(4, 5, 100.0);
    topology
}

fn assert_matches_reference(network: &Network, tolerance: f64) {
    for id in network.router_ids() {
        let router = network.router(id).unwrap();
        if !router.is_active() {
            continue;
        }
        let reference = network.reference_routes(id).unwrap();
        let table = router.routing_table();
        assert!(
            table.equivalent(&reference, tolerance),
            "router {} table {:?} differs from reference {:?}",
            id,
            table,
            reference
        );
    }
}

#[test]
fn tables_match_reference_spf() {
    let topologies = [Topology::ring(5, 100.0), mixed_ring(), grid(3, 3), two_islands()];
    for protocol in [Protocol::Ospf, Protocol::Gospf] {
        for topology in &topologies {
            let mut network = build_network(topology, protocol, SimConfig::default()).unwrap();
            let convergence = network.run_until_converged(100);
            assert!(convergence.is_converged(), "{} did not converge", protocol);
            assert_matches_reference(&network, 1e-9);
        }
    }
}

#[test]
fn partially_sleeping_ecorp_tables_match_reference_spf() {
    let config = SimConfig { sleep_dwell: 8, ..SimConfig::default() };
    let epsilon = config.cost_epsilon;
    let mut network = build_network(&Topology::ring(5, 100.0), Protocol::EcoRp, config).unwrap();
    assert!(network.run_until_converged(20).is_converged());

    // 1-2-3 stays busy, the 3-4-5-1 arc goes to sleep
    for _ in 0..40 {
        network.inject_traffic(1, 3, 10.0).unwrap();
        network.tick_once();
    }
    assert!(network.run_until_converged(20).is_converged());

    for (a, b) in [(3, 4), (4, 5), (5, 1)] {
        assert_eq!(network.link_between(a, b).unwrap().state(), LinkState::Sleeping);
    }
    for (a, b) in [(1, 2), (2, 3)] {
        assert_eq!(network.link_between(a, b).unwrap().state(), LinkState::Active);
    }
    for id in [4, 5] {
        assert_eq!(network.router(id).unwrap().state(), RouterState::Sleeping);
    }
    assert_eq!(network.routers().filter(|r| r.is_active()).count(), 3);

    // advertised costs trail the true ones by at most epsilon per hop
    assert_matches_reference(&network, epsilon * network.router_ids().len() as f64);
    let to_four = network.router(1).unwrap().routing_table().get_route(4).unwrap();
    assert_eq!((to_four.next_hop, to_four.dormant), (5, true));
    assert_eq!(network.metrics().dropped(), 0);
}

#[test]
fn islands_do_not_route_to_each_other() {
    let mut network = build_network(&two_islands(), Protocol::Ospf, SimConfig::default()).unwrap();
    network.run_until_converged(100);

    assert_eq!(network.path(1, 3).unwrap(), vec![1, 2, 3]);
    assert!(matches!(
        network.path(1, 5),
        Err(SimError::UnreachableDestination { src: 1, dst: 5 })
    ));
    assert!(network.router(4).unwrap().routing_table().get_route(1).is_none());
}

#[test]
fn converged_network_stays_quiet() {
    let mut network = build_network(&grid(3, 3), Protocol::Gospf, SimConfig::default()).unwrap();
    assert!(network.run_until_converged(100).is_converged());
    let sequences: Vec<u64> = network.routers().map(|r| r.sequence()).collect();

    network.tick(20);
    assert!(network.is_converged());
    assert_eq!(network.routers().map(|r| r.sequence()).collect::<Vec<_>>(), sequences);
}

#[test]
fn periodic_refresh_keeps_entries_alive() {
    let config = SimConfig {
        max_age: 10,
        lsa_refresh_interval: 4,
        ..SimConfig::default()
    };
    let mut network = build_network(&Topology::ring(4, 100.0), Protocol::Ospf, config).unwrap();
    network.tick(50);

    for router in network.routers() {
        assert_eq!(router.lsdb().len(), 4);
        assert!(router.sequence() > 10);
    }
    assert_matches_reference(&network, 1e-9);
}

#[test]
fn unknown_router_is_an_error() {
    let mut network = build_network(&Topology::ring(3, 100.0), Protocol::Ospf, SimConfig::default()).unwrap();
    assert!(matches!(network.inject_traffic(9, 1, 1.0), Err(SimError::UnknownRouter(9))));
    assert!(matches!(network.reference_routes(9), Err(SimError::UnknownRouter(9))));
}
