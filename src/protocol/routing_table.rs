use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::RouterId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingEntry {
    pub destination: RouterId,
    pub next_hop: RouterId,
    pub cost: f64,
    /// The path crosses at least one sleeping link.
    pub dormant: bool,
}

/// Committed routing table. Rebuilt as a whole and swapped in, never edited
/// entry by entry, so readers only ever see a complete table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoutingTable {
    entries: BTreeMap<RouterId, RoutingEntry>,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = RoutingEntry>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|entry| (entry.destination, entry))
                .collect(),
        }
    }

    pub fn get_route(&self, destination: RouterId) -> Option<&RoutingEntry> {
        self.entries.get(&destination)
    }

    pub fn next_hop(&self, destination: RouterId) -> Option<RouterId> {
        self.entries.get(&destination).map(|entry| entry.next_hop)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RouterId, &RoutingEntry)> {
        self.entries.iter()
    }

    /// Same destinations, next hops and dormant flags, costs equal within `tolerance`.
    pub fn equivalent(&self, other: &RoutingTable, tolerance: f64) -> bool {
        self.entries.len() == other.entries.len()
            && self.entries.iter().all(|(dest, entry)| {
                other.entries.get(dest).is_some_and(|o| {
                    o.next_hop == entry.next_hop
                        && o.dormant == entry.dormant
                        && (o.cost - entry.cost).abs() <= tolerance
                })
            })
    }
}
