use std::collections::{BTreeMap, BTreeSet};

use log::debug;

use super::messages::LsaMessage;
use crate::RouterId;

/// Outcome of offering an LSA to a database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallResult {
    Installed,
    /// Sequence number not strictly newer than the stored one.
    Stale,
}

/// Most recent LSA from every known origin.
#[derive(Debug, Clone)]
pub struct LinkStateDatabase {
    owner: RouterId,
    entries: BTreeMap<RouterId, LsaMessage>,
}

impl LinkStateDatabase {
    pub fn new(owner: RouterId) -> Self {
        Self {
            owner,
            entries: BTreeMap::new(),
        }
    }

    pub fn install(&mut self, lsa: LsaMessage) -> InstallResult {
        if let Some(existing) = self.entries.get(&lsa.origin) {
            if lsa.sequence <= existing.sequence {
                return InstallResult::Stale;
            }
        }
        self.entries.insert(lsa.origin, lsa);
        InstallResult::Installed
    }

    pub fn get(&self, origin: RouterId) -> Option<&LsaMessage> {
        self.entries.get(&origin)
    }

    pub fn sequence_of(&self, origin: RouterId) -> Option<u64> {
        self.entries.get(&origin).map(|lsa| lsa.sequence)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LsaMessage> {
        self.entries.values()
    }

    /// Ages every foreign entry by one tick and purges those past `max_age`.
    /// The owner's own LSA is kept alive by re-origination instead, and an
    /// entry whose origin is advertised behind a dormant link is held at its
    /// age until that link wakes.
    pub fn age(&mut self, max_age: u64) -> Vec<RouterId> {
        let owner = self.owner;
        let mut purged = Vec::new();

        let held: BTreeSet<RouterId> = self
            .entries
            .values()
            .flat_map(|lsa| {
                lsa.links
                    .iter()
                    .filter(move |advert| advert.dormant && advert.neighbor != lsa.origin)
                    .map(|advert| advert.neighbor)
            })
            .collect();

        for lsa in self.entries.values_mut() {
            if lsa.origin != owner && !held.contains(&lsa.origin) {
                lsa.age += 1;
            }
        }
        self.entries.retain(|origin, lsa| {
            let keep = *origin == owner || lsa.age <= max_age;
            if !keep {
                purged.push(*origin);
            }
            keep
        });

        if !purged.is_empty() {
            debug!("Router {} purged aged LSAs from {:?}", owner, purged);
        }
        purged
    }
}
