//! Peer transport: TCP links carrying `Hello` and `PeerList` frames.
//!
//! Every live link has one entry in the connection table, keyed by the id
//! the registry sees. The entry owns the link's outbound queue, so gossip can
//! reach a peer without touching its socket.

pub mod connection;
pub mod dialer;
pub mod listener;

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use dashmap::DashMap;
use tokio::sync::mpsc;

use swarm_core::wire::WireError;
use swarm_core::SharedNodeDetails;
use swarm_services::{AddressResolver, ConnectionId, PeerRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// The remote side dialled us; recorded as a server peer.
    Inbound,
    /// We dialled the remote side; recorded as a client peer.
    Outbound,
}

#[derive(Debug)]
pub struct ConnectionMeta {
    pub addr: SocketAddr,
    pub direction: Direction,
    pub established_at: Instant,
    /// Encoded frames queued for this link.
    pub outbound: mpsc::UnboundedSender<Bytes>,
}

pub type ConnectionTable = Arc<DashMap<ConnectionId, ConnectionMeta>>;

pub fn new_connection_table() -> ConnectionTable {
    Arc::new(DashMap::new())
}

/// Registry address hook backed by the connection table.
pub fn resolver(table: &ConnectionTable) -> AddressResolver {
    let table = table.clone();
    Arc::new(move |id| table.get(&id).map(|meta| meta.addr.to_string()))
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("i/o: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Wire(#[from] WireError),
    #[error("expected hello, got {0:?}")]
    HandshakeExpected(swarm_core::wire::FrameKind),
    #[error("peer presented our own identity")]
    SelfDial,
}

/// State every connection task needs.
#[derive(Clone)]
pub struct Transport {
    pub table: ConnectionTable,
    pub registry: PeerRegistry,
    pub details: SharedNodeDetails,
    next_id: Arc<AtomicU64>,
}

impl Transport {
    pub fn new(table: ConnectionTable, registry: PeerRegistry, details: SharedNodeDetails) -> Self {
        Self {
            table,
            registry,
            details,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Allocate an id and table entry for a new link.
    pub fn register(
        &self,
        addr: SocketAddr,
        direction: Direction,
    ) -> (ConnectionId, mpsc::UnboundedReceiver<Bytes>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.table.insert(
            id,
            ConnectionMeta {
                addr,
                direction,
                established_at: Instant::now(),
                outbound: tx,
            },
        );
        (id, rx)
    }

    /// Drop a link from the table and from whichever registry map holds it.
    pub fn unregister(&self, id: ConnectionId) {
        let Some((_, meta)) = self.table.remove(&id) else {
            return;
        };
        let removed = match meta.direction {
            Direction::Inbound => self.registry.remove_server_peer(id),
            Direction::Outbound => self.registry.remove_client_peer(id),
        };
        tracing::debug!(
            conn = id,
            uptime_ms = meta.established_at.elapsed().as_millis() as u64,
            "link removed"
        );
        if let Some(details) = removed {
            tracing::info!(conn = id, peer = details.public_key.short(), "peer disconnected");
        }
    }

    /// Queue one encoded frame on every live link. Returns how many accepted it.
    pub fn broadcast(&self, frame: Bytes) -> usize {
        self.table
            .iter()
            .filter(|entry| entry.outbound.send(frame.clone()).is_ok())
            .count()
    }
}
