//! Periodic peer-list exchange.
//!
//! Each tick, this node's own details plus the details of every connected
//! peer go out as one `PeerList` frame on every live link. Receivers merge
//! them into their suggestion pool, which is what discovery draws from.

use std::collections::BTreeMap;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;

use swarm_core::wire::PeerMessage;

use crate::transport::Transport;

/// Own details followed by connected peers, one entry per identity.
pub fn peer_list(transport: &Transport) -> PeerMessage {
    let own = transport.details.details();
    let mut peers = BTreeMap::new();
    transport.registry.with_snapshot(|t| {
        for details in t.server_peers.values().chain(t.client_peers.values()) {
            if details.public_key != own.public_key {
                peers
                    .entry(details.public_key.clone())
                    .or_insert_with(|| details.clone());
            }
        }
    });

    PeerMessage::PeerList(std::iter::once(own).chain(peers.into_values()).collect())
}

/// Encode one peer list and queue it on every link.
pub fn gossip_once(transport: &Transport) -> usize {
    let msg = peer_list(transport);
    match msg.encode() {
        Ok(frame) => transport.broadcast(Bytes::from(frame)),
        Err(e) => {
            tracing::warn!(error = %e, "failed to encode peer list");
            0
        }
    }
}

pub async fn gossip_loop(transport: Transport, every: Duration, mut shutdown: broadcast::Receiver<()>) {
    let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + every, every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!("gossip shutting down");
                return;
            }
            _ = interval.tick() => {
                let links = gossip_once(&transport);
                tracing::debug!(links, "peer list sent");
            }
        }
    }
}
