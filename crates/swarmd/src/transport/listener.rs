//! Inbound side of the peer transport.

use std::net::{Ipv4Addr, SocketAddrV4};

use anyhow::{Context, Result};
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use super::connection::run_connection;
use super::{Direction, Transport};

/// Bind the peer port on all IPv4 interfaces.
pub fn bind(port: u16) -> Result<TcpListener> {
    let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP)).context("socket()")?;
    socket.set_reuse_address(true).context("SO_REUSEADDR")?;
    socket.set_nonblocking(true).context("set_nonblocking")?;

    let bind_addr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port);
    socket.bind(&bind_addr.into()).context("bind()")?;
    socket.listen(1024).context("listen()")?;

    TcpListener::from_std(socket.into()).context("failed to convert to tokio TcpListener")
}

/// Accept peers until shutdown, one task per link.
pub async fn accept_loop(
    transport: Transport,
    listener: TcpListener,
    mut shutdown: broadcast::Receiver<()>,
) {
    if let Ok(local) = listener.local_addr() {
        tracing::info!(addr = %local, "peer listener starting");
    }

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!("peer listener shutting down");
                return;
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => {
                    let _ = stream.set_nodelay(true);
                    tokio::spawn(run_connection(transport.clone(), stream, addr, Direction::Inbound));
                }
                Err(e) => tracing::warn!(error = %e, "accept failed"),
            },
        }
    }
}
