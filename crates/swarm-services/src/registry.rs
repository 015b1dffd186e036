//! Peer registry: who is connected to us, who we connected to, and who we
//! have heard about.
//!
//! Three collections live behind one lock:
//! - `server_peers`: inbound connections, keyed by transport connection id
//! - `client_peers`: outbound connections, keyed by transport connection id
//! - `suggestions`:  nodes learned through gossip, not necessarily connected
//!
//! All access is scoped: callers pass a closure that receives a borrow valid
//! only for the duration of the call. A single `with_snapshot` read sees all
//! three collections at one consistent instant.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use swarm_core::NodeDetails;

use crate::connector::Connector;

/// Identifier the transport assigns to a live connection.
pub type ConnectionId = u64;

/// Maps a connection id to a routable address, if the connection is known.
pub type AddressResolver = Arc<dyn Fn(ConnectionId) -> Option<String> + Send + Sync>;

/// Default bound on the suggestion pool.
pub const DEFAULT_MAX_SUGGESTIONS: usize = 1024;

/// The guarded registry state.
#[derive(Debug, Clone, Default)]
pub struct PeerTables {
    pub server_peers: BTreeMap<ConnectionId, NodeDetails>,
    pub client_peers: BTreeMap<ConnectionId, NodeDetails>,
    pub suggestions: Vec<NodeDetails>,
}

/// Shared handle to the registry. Clones refer to the same tables.
#[derive(Clone)]
pub struct PeerRegistry {
    tables: Arc<RwLock<PeerTables>>,
    connector: Arc<dyn Connector>,
    resolver: AddressResolver,
    max_suggestions: usize,
}

impl PeerRegistry {
    pub fn new(connector: Arc<dyn Connector>, resolver: AddressResolver) -> Self {
        Self {
            tables: Arc::new(RwLock::new(PeerTables::default())),
            connector,
            resolver,
            max_suggestions: DEFAULT_MAX_SUGGESTIONS,
        }
    }

    /// Bound the suggestion pool. Oldest suggestions are evicted first.
    pub fn with_max_suggestions(mut self, max: usize) -> Self {
        self.max_suggestions = max;
        self
    }

    fn read<R>(&self, f: impl FnOnce(&PeerTables) -> R) -> R {
        let guard = self.tables.read().unwrap_or_else(|e| e.into_inner());
        f(&guard)
    }

    fn write<R>(&self, f: impl FnOnce(&mut PeerTables) -> R) -> R {
        let mut guard = self.tables.write().unwrap_or_else(|e| e.into_inner());
        f(&mut guard)
    }

    // ── Connection lifecycle ──────────────────────────────────────────────────

    /// Record an inbound peer. A repeated id overwrites the previous entry.
    pub fn add_server_peer(&self, id: ConnectionId, details: NodeDetails) {
        tracing::debug!(conn = id, peer = details.public_key.short(), "server peer added");
        self.write(|t| t.server_peers.insert(id, details));
    }

    /// Record an outbound peer. A repeated id overwrites the previous entry.
    pub fn add_client_peer(&self, id: ConnectionId, details: NodeDetails) {
        tracing::debug!(conn = id, peer = details.public_key.short(), "client peer added");
        self.write(|t| t.client_peers.insert(id, details));
    }

    pub fn remove_server_peer(&self, id: ConnectionId) -> Option<NodeDetails> {
        self.write(|t| t.server_peers.remove(&id))
    }

    pub fn remove_client_peer(&self, id: ConnectionId) -> Option<NodeDetails> {
        self.write(|t| t.client_peers.remove(&id))
    }

    // ── Scoped reads ──────────────────────────────────────────────────────────

    pub fn with_server_peers<R>(&self, f: impl FnOnce(&BTreeMap<ConnectionId, NodeDetails>) -> R) -> R {
        self.read(|t| f(&t.server_peers))
    }

    pub fn with_client_peers<R>(&self, f: impl FnOnce(&BTreeMap<ConnectionId, NodeDetails>) -> R) -> R {
        self.read(|t| f(&t.client_peers))
    }

    pub fn with_suggestions<R>(&self, f: impl FnOnce(&[NodeDetails]) -> R) -> R {
        self.read(|t| f(&t.suggestions))
    }

    /// All three collections under one read.
    pub fn with_snapshot<R>(&self, f: impl FnOnce(&PeerTables) -> R) -> R {
        self.read(f)
    }

    /// Connected peers in both directions.
    pub fn peer_count(&self) -> usize {
        self.read(|t| t.server_peers.len() + t.client_peers.len())
    }

    pub fn suggestion_count(&self) -> usize {
        self.read(|t| t.suggestions.len())
    }

    // ── Gossip intake ─────────────────────────────────────────────────────────

    /// Merge gossiped node details into the suggestion pool.
    ///
    /// A suggestion whose public key is already pooled is replaced in place;
    /// new ones are appended. Entries without a public key are ignored.
    /// Returns the number of newly added suggestions.
    pub fn merge_suggestions(&self, peers: impl IntoIterator<Item = NodeDetails>) -> usize {
        let max = self.max_suggestions;
        self.write(|t| {
            let mut added = 0;
            for peer in peers {
                if peer.public_key.is_empty() {
                    continue;
                }
                match t
                    .suggestions
                    .iter_mut()
                    .find(|s| s.public_key == peer.public_key)
                {
                    Some(existing) => *existing = peer,
                    None => {
                        t.suggestions.push(peer);
                        added += 1;
                    }
                }
            }
            if t.suggestions.len() > max {
                let excess = t.suggestions.len() - max;
                t.suggestions.drain(..excess);
            }
            added
        })
    }

    /// Replace the whole suggestion pool.
    pub fn replace_suggestions(&self, peers: Vec<NodeDetails>) {
        let max = self.max_suggestions;
        self.write(|t| {
            t.suggestions = peers;
            if t.suggestions.len() > max {
                let excess = t.suggestions.len() - max;
                t.suggestions.drain(..excess);
            }
        });
    }

    // ── Transport hooks ───────────────────────────────────────────────────────

    /// Routable address of a live connection.
    pub fn resolve_client_address(&self, id: ConnectionId) -> Option<String> {
        (self.resolver)(id)
    }

    /// Ask the transport to connect and handshake with `host:port`. Returns immediately.
    pub fn bootstrap(&self, host: &str, port: u16) {
        tracing::debug!(host, port, "bootstrap requested");
        self.connector.connect(host, port);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::thread;
    use swarm_core::EntryPoint;

    #[derive(Default)]
    struct RecordingConnector {
        calls: Mutex<Vec<(String, u16)>>,
    }

    impl Connector for RecordingConnector {
        fn connect(&self, host: &str, port: u16) {
            self.calls.lock().unwrap().push((host.to_string(), port));
        }
    }

    fn details(pk: &str, port: u16) -> NodeDetails {
        let mut d = NodeDetails::new(pk.into(), port, port + 80);
        d.add_entry_point(EntryPoint::swarm("10.0.0.1", port, port + 80));
        d
    }

    fn registry() -> (PeerRegistry, Arc<RecordingConnector>) {
        let connector = Arc::new(RecordingConnector::default());
        let resolver: AddressResolver =
            Arc::new(|id| (id == 7).then(|| "192.168.1.7:40000".to_string()));
        (PeerRegistry::new(connector.clone(), resolver), connector)
    }

    #[test]
    fn new_registry_is_empty() {
        let (reg, _) = registry();
        assert_eq!(reg.peer_count(), 0);
        assert_eq!(reg.suggestion_count(), 0);
        reg.with_snapshot(|t| {
            assert!(t.server_peers.is_empty());
            assert!(t.client_peers.is_empty());
            assert!(t.suggestions.is_empty());
        });
    }

    #[test]
    fn server_and_client_peers_are_separate() {
        let (reg, _) = registry();
        reg.add_server_peer(1, details("a", 8000));
        reg.add_client_peer(2, details("b", 8001));

        reg.with_server_peers(|m| {
            assert_eq!(m.len(), 1);
            assert_eq!(m[&1].public_key.as_str(), "a");
        });
        reg.with_client_peers(|m| {
            assert_eq!(m.len(), 1);
            assert_eq!(m[&2].public_key.as_str(), "b");
        });
        assert_eq!(reg.peer_count(), 2);
    }

    #[test]
    fn duplicate_id_last_write_wins() {
        let (reg, _) = registry();
        reg.add_client_peer(3, details("old", 8000));
        reg.add_client_peer(3, details("new", 8001));
        reg.with_client_peers(|m| {
            assert_eq!(m.len(), 1);
            assert_eq!(m[&3].public_key.as_str(), "new");
        });
    }

    #[test]
    fn remove_on_disconnect() {
        let (reg, _) = registry();
        reg.add_server_peer(1, details("a", 8000));
        assert_eq!(reg.remove_server_peer(1).unwrap().public_key.as_str(), "a");
        assert!(reg.remove_server_peer(1).is_none());
        assert!(reg.remove_client_peer(1).is_none());
        assert_eq!(reg.peer_count(), 0);
    }

    #[test]
    fn merge_replaces_by_public_key_and_appends_new() {
        let (reg, _) = registry();
        assert_eq!(reg.merge_suggestions(vec![details("a", 8000), details("b", 8001)]), 2);
        assert_eq!(reg.merge_suggestions(vec![details("a", 9000), details("c", 8002)]), 1);

        reg.with_suggestions(|s| {
            let keys: Vec<_> = s.iter().map(|d| d.public_key.as_str()).collect();
            assert_eq!(keys, vec!["a", "b", "c"]);
            assert_eq!(s[0].default_port, 9000);
        });
    }

    #[test]
    fn merge_skips_entries_without_identity() {
        let (reg, _) = registry();
        assert_eq!(reg.merge_suggestions(vec![NodeDetails::default()]), 0);
        assert_eq!(reg.suggestion_count(), 0);
    }

    #[test]
    fn suggestion_pool_evicts_oldest() {
        let (reg, _) = registry();
        let reg = reg.with_max_suggestions(2);
        reg.merge_suggestions(vec![details("a", 1), details("b", 2), details("c", 3)]);
        reg.with_suggestions(|s| {
            let keys: Vec<_> = s.iter().map(|d| d.public_key.as_str()).collect();
            assert_eq!(keys, vec!["b", "c"]);
        });
    }

    #[test]
    fn replace_suggestions_is_wholesale() {
        let (reg, _) = registry();
        reg.merge_suggestions(vec![details("a", 1)]);
        reg.replace_suggestions(vec![details("x", 2)]);
        reg.with_suggestions(|s| {
            assert_eq!(s.len(), 1);
            assert_eq!(s[0].public_key.as_str(), "x");
        });
    }

    #[test]
    fn resolve_client_address_uses_hook() {
        let (reg, _) = registry();
        assert_eq!(reg.resolve_client_address(7).as_deref(), Some("192.168.1.7:40000"));
        assert_eq!(reg.resolve_client_address(8), None);
    }

    #[test]
    fn bootstrap_hands_off_to_connector() {
        let (reg, connector) = registry();
        reg.bootstrap("10.0.0.9", 8123);
        assert_eq!(
            *connector.calls.lock().unwrap(),
            vec![("10.0.0.9".to_string(), 8123)]
        );
    }

    #[test]
    fn snapshot_never_sees_half_applied_updates() {
        // The writer always records a server peer before the matching client
        // peer, so any single snapshot has at least as many server entries.
        let (reg, _) = registry();
        let writer = {
            let reg = reg.clone();
            thread::spawn(move || {
                for i in 0..500u64 {
                    reg.add_server_peer(i, details("s", 8000));
                    reg.add_client_peer(i, details("c", 8001));
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let reg = reg.clone();
                thread::spawn(move || {
                    for _ in 0..500 {
                        reg.with_snapshot(|t| {
                            assert!(t.client_peers.len() <= t.server_peers.len());
                        });
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for r in readers {
            r.join().unwrap();
        }
        assert_eq!(reg.peer_count(), 1000);
    }
}
