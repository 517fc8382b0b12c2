use serde::{Deserialize, Serialize};

use crate::config::SimConfig;
use crate::error::Result;
use crate::protocol::Protocol;
use crate::RouterId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkSpec {
    pub a: RouterId,
    pub b: RouterId,
    pub bandwidth: f64,
}

/// Router and link sets of a simulation. Validated by `Network::new`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Topology {
    pub routers: Vec<RouterId>,
    pub links: Vec<LinkSpec>,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_router(&mut self, id: RouterId) -> &mut Self {
        self.routers.push(id);
        self
    }

    pub fn add_link(&mut self, a: RouterId, b: RouterId, bandwidth: f64) -> &mut Self {
        self.links.push(LinkSpec { a, b, bandwidth });
        self
    }

    /// Routers `1..=n` connected in a cycle `1-2-...-n-1`.
    pub fn ring(n: RouterId, bandwidth: f64) -> Self {
        let mut topology = Self::new();
        for id in 1..=n {
            topology.add_router(id);
        }
        for id in 1..=n {
            let next = if id == n { 1 } else { id + 1 };
            topology.add_link(id, next, bandwidth);
        }
        topology
    }
}

/// Everything needed to build a network, as stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopologyConfig {
    pub protocol: Protocol,
    #[serde(default)]
    pub config: SimConfig,
    pub topology: Topology,
}

impl TopologyConfig {
    pub fn new(protocol: Protocol, topology: Topology) -> Self {
        Self {
            protocol,
            config: SimConfig::default(),
            topology,
        }
    }

    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: TopologyConfig = serde_json::from_str(&content)?;
        config.config.validate()?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: &str) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_closes_the_cycle() {
        let ring = Topology::ring(4, 100.0);
        assert_eq!(ring.routers, vec![1, 2, 3, 4]);
        let pairs: Vec<_> = ring.links.iter().map(|l| (l.a, l.b)).collect();
        assert_eq!(pairs, vec![(1, 2), (2, 3), (3, 4), (4, 1)]);
    }

    #[test]
    fn file_round_trip_keeps_protocol() {
        let path = std::env::temp_dir().join(format!("eco-ospf-topology-{}.json", std::process::id()));
        let path = path.to_str().unwrap();
        let config = TopologyConfig::new(Protocol::EcoRp, Topology::ring(3, 10.0));
        config.save_to_file(path).unwrap();

        let loaded = TopologyConfig::load_from_file(path).unwrap();
        assert_eq!(loaded.protocol, Protocol::EcoRp);
        assert_eq!(loaded.topology.links.len(), 3);
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn missing_topology_file_is_an_io_error() {
        let path = std::env::temp_dir().join("eco-ospf-no-such-topology.json");
        let result = TopologyConfig::load_from_file(path.to_str().unwrap());
        assert!(matches!(result, Err(crate::SimError::Io(_))));
    }

    #[test]
    fn config_section_is_optional() {
        let json = r#"{
            "protocol": "ospf",
            "topology": { "routers": [1, 2], "links": [{ "a": 1, "b": 2, "bandwidth": 10.0 }] }
        }"#;
        let loaded: TopologyConfig = serde_json::from_str(json).unwrap();
        assert_eq!(loaded.protocol, Protocol::Ospf);
        assert_eq!(loaded.config.ref_bandwidth, 100.0);
    }
}
