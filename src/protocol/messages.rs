use serde::{Deserialize, Serialize};

use crate::RouterId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Packet {
    Hello(HelloMessage),
    Lsa(LsaMessage),
    Probe(ProbeMessage),
}

impl Packet {
    pub fn origin(&self) -> RouterId {
        match self {
            Packet::Hello(hello) => hello.router_id,
            Packet::Lsa(lsa) => lsa.origin,
            Packet::Probe(probe) => probe.origin,
        }
    }

    pub fn sequence(&self) -> u64 {
        match self {
            Packet::Hello(hello) => hello.sequence,
            Packet::Lsa(lsa) => lsa.sequence,
            Packet::Probe(probe) => probe.sequence,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Packet::Hello(_) => "hello",
            Packet::Lsa(_) => "lsa",
            Packet::Probe(_) => "probe",
        }
    }
}

/// Sent to every neighbor when a router (re)joins the live topology.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelloMessage {
    pub router_id: RouterId,
    pub sequence: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkAdvert {
    pub neighbor: RouterId,
    pub cost: f64,
    /// The link is sleeping: known, but not part of the live topology.
    pub dormant: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LsaMessage {
    pub origin: RouterId,
    pub sequence: u64,
    /// Ticks since origination, incremented while the LSA sits in a database.
    pub age: u64,
    pub links: Vec<LinkAdvert>,
}

impl LsaMessage {
    pub fn advert_for(&self, neighbor: RouterId) -> Option<&LinkAdvert> {
        self.links.iter().find(|advert| advert.neighbor == neighbor)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeMessage {
    pub origin: RouterId,
    pub sequence: u64,
    pub volume: f64,
    /// A wake-probe is the only packet a sleeping router accepts.
    pub wake: bool,
}
