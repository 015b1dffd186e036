//! Swarm integration test harness.
//!
//! Several `SwarmService`s wired together by an in-memory network. A dial
//! completes synchronously: both registries learn about each other before
//! `connect` returns, the way a real transport would after its handshake.
//! Gossip runs only when a test calls `gossip_round`, so tests control
//! exactly what each node has heard about.
//!
//!   cargo test --test integration

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use swarm_core::{NodeDetails, PublicKey};
use swarm_services::{
    AddressResolver, ConnectionId, Connector, DiscoverySettings, NodeIdentity, PeerRegistry,
    SwarmService,
};

mod discovery;
mod lifecycle;

// ── Harness ───────────────────────────────────────────────────────────────────

pub const PEER_PORT: u16 = 8000;
pub const HTTP_PORT: u16 = 8080;
pub const INTERVAL: Duration = Duration::from_millis(2000);

pub fn host_of(index: usize) -> String {
    format!("10.0.0.{}", index + 1)
}

#[derive(Default)]
pub struct Network {
    nodes: Mutex<Vec<SwarmService>>,
    addresses: Arc<Mutex<HashMap<ConnectionId, String>>>,
    next_conn: AtomicU64,
    /// Every dial attempted, as (dialling node index, host).
    pub dials: Mutex<Vec<(usize, String)>>,
}

struct MemConnector {
    network: Weak<Network>,
    from: usize,
}

impl Connector for MemConnector {
    fn connect(&self, host: &str, port: u16) {
        if let Some(network) = self.network.upgrade() {
            network.link(self.from, host, port);
        }
    }
}

impl Network {
    /// Build `count` nodes, each advertising `10.0.0.<i+1>:8000`.
    pub fn new(count: usize, desired_connectivity: usize) -> Arc<Self> {
        let network = Arc::new(Network::default());
        for i in 0..count {
            let connector = Arc::new(MemConnector {
                network: Arc::downgrade(&network),
                from: i,
            });
            let addresses = network.addresses.clone();
            let resolver: AddressResolver =
                Arc::new(move |id| addresses.lock().unwrap().get(&id).cloned());
            let registry = PeerRegistry::new(connector, resolver);
            let service = SwarmService::new(
                NodeIdentity {
                    public_key: PublicKey::new(format!("node-{i}")),
                    peer_port: PEER_PORT,
                    http_port: HTTP_PORT,
                    advertise_host: host_of(i),
                },
                DiscoverySettings {
                    interval: INTERVAL,
                    desired_connectivity,
                    shuffle_seed: Some(i as u64),
                },
                registry,
            );
            network.nodes.lock().unwrap().push(service);
        }
        network
    }

    pub fn node(&self, index: usize) -> SwarmService {
        self.nodes.lock().unwrap()[index].clone()
    }

    pub fn len(&self) -> usize {
        self.nodes.lock().unwrap().len()
    }

    fn link(&self, from: usize, host: &str, port: u16) {
        self.dials.lock().unwrap().push((from, host.to_string()));

        let (source, target) = {
            let nodes = self.nodes.lock().unwrap();
            let target = nodes.iter().find(|n| {
                n.details()
                    .read(|d| d.entry_points.iter().any(|e| e.host == host && e.port == port))
            });
            match target {
                Some(t) => (nodes[from].clone(), t.clone()),
                None => return,
            }
        };

        // Self-dial: the handshake would reveal our own key and close.
        if source.public_key() == target.public_key() {
            return;
        }

        let id = self.next_conn.fetch_add(1, Ordering::Relaxed);
        self.addresses
            .lock()
            .unwrap()
            .insert(id, format!("{host}:{port}"));
        source.registry().add_client_peer(id, target.details().details());
        target.registry().add_server_peer(id, source.details().details());
    }

    /// Every node pushes its own details plus its connected peers to each peer.
    pub fn gossip_round(&self) {
        let nodes: Vec<SwarmService> = self.nodes.lock().unwrap().clone();
        let by_key: HashMap<PublicKey, SwarmService> =
            nodes.iter().map(|n| (n.public_key(), n.clone())).collect();

        for node in &nodes {
            let mut list = vec![node.details().details()];
            let neighbours = node.registry().with_snapshot(|t| {
                let peers: Vec<NodeDetails> = t
                    .server_peers
                    .values()
                    .chain(t.client_peers.values())
                    .cloned()
                    .collect();
                peers
            });
            list.extend(neighbours.iter().cloned());

            for peer in &neighbours {
                if let Some(receiver) = by_key.get(&peer.public_key) {
                    let own = receiver.public_key();
                    receiver.registry().merge_suggestions(
                        list.iter().filter(|d| d.public_key != own).cloned(),
                    );
                }
            }
        }
    }

    /// Identities a node is linked with, either direction, excluding itself.
    pub fn linked(&self, index: usize) -> BTreeSet<PublicKey> {
        let node = self.node(index);
        node.registry().with_snapshot(|t| {
            t.server_peers
                .values()
                .chain(t.client_peers.values())
                .map(|d| d.public_key.clone())
                .collect()
        })
    }

    pub fn dials_from(&self, index: usize) -> usize {
        self.dials.lock().unwrap().iter().filter(|(f, _)| *f == index).count()
    }
}

/// Let one discovery interval elapse on the paused clock, then gossip.
pub async fn tick(network: &Network) {
    tokio::time::sleep(INTERVAL + Duration::from_millis(1)).await;
    network.gossip_round();
}
