//! Outbound connection seam between the registry and the transport.

use tokio::sync::mpsc;

/// Opens outbound peer connections on behalf of `PeerRegistry::bootstrap`.
///
/// `connect` must return immediately. The outcome is reported later through
/// the transport's own connection lifecycle (`add_client_peer` on handshake,
/// nothing at all on failure).
pub trait Connector: Send + Sync {
    fn connect(&self, host: &str, port: u16);
}

/// A request to dial one peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialRequest {
    pub host: String,
    pub port: u16,
}

/// Connector that queues dial requests for a transport task.
#[derive(Debug, Clone)]
pub struct ChannelConnector {
    tx: mpsc::UnboundedSender<DialRequest>,
}

impl ChannelConnector {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<DialRequest>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Connector for ChannelConnector {
    fn connect(&self, host: &str, port: u16) {
        let req = DialRequest {
            host: host.to_string(),
            port,
        };
        if self.tx.send(req).is_err() {
            tracing::warn!(host, port, "dialer gone, bootstrap request dropped");
        }
    }
}
