pub mod algorithms;
pub mod config;
pub mod error;
pub mod monitor;
pub mod network;
pub mod protocol;
pub mod router;

use std::sync::Arc;
use tokio::sync::RwLock;

pub use config::{SimConfig, TopologyConfig};
pub use error::{Result, SimError};
pub use network::{Convergence, Network, Snapshot};
pub use protocol::Protocol;
pub use router::{Router, RouterState};

pub type RouterId = u32;
pub type LinkId = usize;

/// A network shared between the tick driver (single writer) and pollers.
pub type SharedNetwork = Arc<RwLock<Network>>;

/// Builds a network from a topology description, a protocol variant and its
/// tunables. Every router originates its first LSA during construction.
pub fn build_network(
    topology: &network::Topology,
    protocol: Protocol,
    config: SimConfig,
) -> Result<Network> {
    Network::new(topology, protocol, config)
}

pub fn into_shared(network: Network) -> SharedNetwork {
    Arc::new(RwLock::new(network))
}
