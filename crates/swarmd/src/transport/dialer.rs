//! Outbound side of the peer transport.
//!
//! Consumes the queue fed by `ChannelConnector`, so `PeerRegistry::bootstrap`
//! never waits on the network. Failed dials are logged and forgotten; the
//! next discovery iteration retries whoever is still unknown.

use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc};

use swarm_services::DialRequest;

use super::connection::run_connection;
use super::{Direction, Transport, TransportError};

/// Dial every queued request until shutdown or until all connectors are gone.
pub async fn dial_loop(
    transport: Transport,
    mut requests: mpsc::UnboundedReceiver<DialRequest>,
    connect_timeout: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!("dialer shutting down");
                return;
            }
            req = requests.recv() => match req {
                Some(req) => {
                    let transport = transport.clone();
                    tokio::spawn(async move {
                        if let Err(e) = dial(transport, &req, connect_timeout).await {
                            tracing::warn!(host = %req.host, port = req.port, error = %e, "dial failed");
                        }
                    });
                }
                None => return,
            },
        }
    }
}

/// Connect to one peer and run the link until it closes.
pub async fn dial(
    transport: Transport,
    req: &DialRequest,
    connect_timeout: Duration,
) -> Result<(), TransportError> {
    let stream = tokio::time::timeout(
        connect_timeout,
        TcpStream::connect((req.host.as_str(), req.port)),
    )
    .await
    .map_err(|_| std::io::Error::new(std::io::ErrorKind::TimedOut, "connect timed out"))??;

    stream.set_nodelay(true)?;
    let addr = stream.peer_addr()?;
    tracing::debug!(peer = %addr, "dialled");
    run_connection(transport, stream, addr, Direction::Outbound).await;
    Ok(())
}
