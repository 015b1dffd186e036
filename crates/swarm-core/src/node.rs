//! Node self-description: identity, advertised ports and entry points.
//!
//! A node publishes one `NodeDetails` describing itself. Each `EntryPoint`
//! names a reachable service on the node together with the capabilities it
//! offers. Only entry points tagged `Capability::Swarm` are ever dialled by
//! peer discovery; every other tag is carried through untouched.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Placeholder host a node advertises until it learns its external address.
pub const LOOPBACK_HOST: &str = "127.0.0.1";

// ── Identity ──────────────────────────────────────────────────────────────────

/// Opaque identity token, unique per node. Compared by value.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PublicKey(String);

impl PublicKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First 16 characters, for log lines.
    pub fn short(&self) -> &str {
        let end = self
            .0
            .char_indices()
            .nth(16)
            .map(|(i, _)| i)
            .unwrap_or(self.0.len());
        &self.0[..end]
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for PublicKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for PublicKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ── Capabilities ──────────────────────────────────────────────────────────────

/// A capability an entry point advertises.
///
/// `Other` holds the bit index of a flag this node does not interpret, so
/// capabilities learned from newer peers survive being passed along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Participates in peer discovery.
    Swarm,
    /// Keeps a copy of the chain.
    ChainKeeper,
    Other(u8),
}

impl Capability {
    /// Bit index in the legacy bitmask representation.
    pub fn bit(self) -> u8 {
        match self {
            Capability::Swarm => 0,
            Capability::ChainKeeper => 1,
            Capability::Other(bit) => bit,
        }
    }

    /// Canonical capability for a bit index.
    pub fn from_bit(bit: u8) -> Self {
        match bit {
            0 => Capability::Swarm,
            1 => Capability::ChainKeeper,
            other => Capability::Other(other),
        }
    }

    fn normalized(self) -> Self {
        Self::from_bit(self.bit())
    }
}

/// Set of capability tags carried by an entry point.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<Capability>", into = "Vec<Capability>")]
pub struct CapabilitySet(BTreeSet<Capability>);

impl CapabilitySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn swarm() -> Self {
        [Capability::Swarm].into_iter().collect()
    }

    pub fn insert(&mut self, cap: Capability) -> bool {
        self.0.insert(cap.normalized())
    }

    pub fn remove(&mut self, cap: Capability) -> bool {
        self.0.remove(&cap.normalized())
    }

    pub fn contains(&self, cap: Capability) -> bool {
        self.0.contains(&cap.normalized())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        self.0.iter().copied()
    }

    /// Build from a legacy bitmask. Bits above 63 cannot occur.
    pub fn from_bits(bits: u64) -> Self {
        (0..64u8)
            .filter(|i| bits & (1u64 << i) != 0)
            .map(Capability::from_bit)
            .collect()
    }

    /// Legacy bitmask. Indices of 64 or more are dropped.
    pub fn bits(&self) -> u64 {
        self.0
            .iter()
            .filter(|c| c.bit() < 64)
            .fold(0u64, |acc, c| acc | (1u64 << c.bit()))
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        Self(iter.into_iter().map(Capability::normalized).collect())
    }
}

impl From<Vec<Capability>> for CapabilitySet {
    fn from(caps: Vec<Capability>) -> Self {
        caps.into_iter().collect()
    }
}

impl From<CapabilitySet> for Vec<Capability> {
    fn from(set: CapabilitySet) -> Self {
        set.0.into_iter().collect()
    }
}

// ── Entry points ──────────────────────────────────────────────────────────────

/// One reachable service on one node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryPoint {
    /// Network address. Hostname or IP literal.
    pub host: String,
    /// Peer-to-peer RPC port.
    pub port: u16,
    /// Introspection HTTP port.
    pub http_port: u16,
    /// Network partition served. 0 = unsharded.
    pub shard: u32,
    pub configuration: CapabilitySet,
}

impl EntryPoint {
    /// An unsharded entry point that takes part in peer discovery.
    pub fn swarm(host: impl Into<String>, port: u16, http_port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            http_port,
            shard: 0,
            configuration: CapabilitySet::swarm(),
        }
    }

    pub fn is_swarm(&self) -> bool {
        self.configuration.contains(Capability::Swarm)
    }

    /// `host:port` of the peer service.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// ── Node details ──────────────────────────────────────────────────────────────

/// A node's description of itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDetails {
    pub public_key: PublicKey,
    pub default_port: u16,
    pub default_http_port: u16,
    /// Append-only during normal operation.
    pub entry_points: Vec<EntryPoint>,
}

impl NodeDetails {
    pub fn new(public_key: PublicKey, default_port: u16, default_http_port: u16) -> Self {
        Self {
            public_key,
            default_port,
            default_http_port,
            entry_points: Vec::new(),
        }
    }

    pub fn add_entry_point(&mut self, entry: EntryPoint) {
        self.entry_points.push(entry);
    }

    /// Entry points eligible as discovery targets.
    pub fn swarm_entry_points(&self) -> impl Iterator<Item = &EntryPoint> {
        self.entry_points.iter().filter(|e| e.is_swarm())
    }

    /// Replace the loopback placeholder on every entry point that still carries it.
    ///
    /// Returns the number of entry points rewritten.
    pub fn set_advertised_host(&mut self, host: &str) -> usize {
        let mut rewritten = 0;
        for entry in self.entry_points.iter_mut() {
            if entry.host == LOOPBACK_HOST {
                entry.host = host.to_string();
                rewritten += 1;
            }
        }
        rewritten
    }
}
