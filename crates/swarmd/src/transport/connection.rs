//! One peer link: handshake, then gossip intake until either side closes.
//!
//! Both ends send `Hello` first. The remote `Hello` decides what the link is:
//! our own identity closes it, anything else is recorded in the registry
//! under the link's direction. Later `PeerList` frames feed the suggestion
//! pool. Whatever ends the link, its registry and table entries are removed.

use std::io;
use std::net::SocketAddr;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use swarm_core::wire::{FrameHeader, PeerMessage, FRAME_HEADER_LEN};
use swarm_core::NodeDetails;
use swarm_services::ConnectionId;

use super::{Direction, Transport, TransportError};

/// Read one frame. `Ok(None)` means the peer closed the stream.
pub async fn read_message<R>(reader: &mut R) -> Result<Option<PeerMessage>, TransportError>
where
    R: AsyncRead + Unpin,
{
    let mut head = [0u8; FRAME_HEADER_LEN];
    match reader.read_exact(&mut head).await {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }
    let header = FrameHeader::parse(&head)?;

    let mut payload = vec![0u8; header.payload_len()];
    reader.read_exact(&mut payload).await?;
    Ok(Some(PeerMessage::decode(&header, &payload)?))
}

/// Drive a link to completion.
pub async fn run_connection<S>(transport: Transport, stream: S, addr: SocketAddr, direction: Direction)
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (mut reader, mut writer) = tokio::io::split(stream);
    let (id, mut outbound) = transport.register(addr, direction);
    tracing::debug!(conn = id, peer = %addr, ?direction, "link opened");

    match transport.details.read(|d| PeerMessage::Hello(d.clone()).encode()) {
        Ok(hello) => {
            if let Some(meta) = transport.table.get(&id) {
                let _ = meta.outbound.send(Bytes::from(hello));
            }
        }
        Err(e) => tracing::warn!(conn = id, error = %e, "failed to encode hello"),
    }

    tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            if let Err(e) = writer.write_all(&frame).await {
                tracing::debug!(conn = id, error = %e, "write failed");
                break;
            }
        }
        let _ = writer.shutdown().await;
    });

    match serve_link(&transport, id, direction, &mut reader).await {
        Ok(()) => tracing::debug!(conn = id, peer = %addr, "link closed"),
        Err(TransportError::SelfDial) => {
            tracing::info!(conn = id, peer = %addr, "dialled ourselves, closing link")
        }
        Err(e) => tracing::warn!(conn = id, peer = %addr, error = %e, "link failed"),
    }

    // Dropping the table entry drops the outbound sender, which ends the writer.
    transport.unregister(id);
}

async fn serve_link<R>(
    transport: &Transport,
    id: ConnectionId,
    direction: Direction,
    reader: &mut R,
) -> Result<(), TransportError>
where
    R: AsyncRead + Unpin,
{
    let own = transport.details.public_key();

    let peer = match read_message(reader).await? {
        None => return Ok(()),
        Some(PeerMessage::Hello(details)) => details,
        Some(other) => return Err(TransportError::HandshakeExpected(other.kind())),
    };
    if peer.public_key == own {
        return Err(TransportError::SelfDial);
    }
    tracing::info!(conn = id, peer = peer.public_key.short(), ?direction, "handshake complete");
    record_peer(transport, id, direction, peer);

    loop {
        match read_message(reader).await? {
            None => return Ok(()),
            Some(PeerMessage::Hello(details)) if details.public_key != own => {
                record_peer(transport, id, direction, details);
            }
            Some(PeerMessage::Hello(_)) => return Err(TransportError::SelfDial),
            Some(PeerMessage::PeerList(peers)) => {
                let received = peers.len();
                let added = transport
                    .registry
                    .merge_suggestions(peers.into_iter().filter(|d| d.public_key != own));
                tracing::trace!(conn = id, received, added, "peer list merged");
            }
        }
    }
}

fn record_peer(transport: &Transport, id: ConnectionId, direction: Direction, details: NodeDetails) {
    match direction {
        Direction::Inbound => transport.registry.add_server_peer(id, details),
        Direction::Outbound => transport.registry.add_client_peer(id, details),
    }
}
