//! swarmd: swarm membership daemon.
//!
//! Usage: `swarmd [peer_port] [http_port] [public_key]`

use std::sync::Arc;

use anyhow::{Context, Result};

use swarm_core::config::SwarmConfig;
use swarm_core::identity::resolve_public_key;
use swarm_services::{ChannelConnector, DiscoverySettings, NodeIdentity, PeerRegistry, SwarmService};

mod gossip;
mod transport;

use transport::{dialer, listener, Transport};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load config
    if let Err(e) = SwarmConfig::write_default_if_missing() {
        tracing::warn!(error = %e, "failed to write default config");
    }
    let mut config = SwarmConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        SwarmConfig::default()
    });
    apply_args(&mut config, std::env::args().skip(1))?;

    let public_key = resolve_public_key(&config.identity.public_key);
    tracing::info!(
        public_key = %public_key,
        peer_port = config.network.peer_port,
        http_port = config.network.http_port,
        "swarmd starting"
    );

    // Shared state
    let table = transport::new_connection_table();
    let (connector, dial_rx) = ChannelConnector::new();
    let registry = PeerRegistry::new(Arc::new(connector), transport::resolver(&table))
        .with_max_suggestions(config.discovery.max_suggestions);

    let service = SwarmService::new(
        NodeIdentity {
            public_key,
            peer_port: config.network.peer_port,
            http_port: config.network.http_port,
            advertise_host: config.network.advertise_host.clone(),
        },
        DiscoverySettings::from(&config.discovery),
        registry.clone(),
    );
    let transport = Transport::new(table, registry.clone(), service.details().clone());

    // ── Shutdown channel ─────────────────────────────────────────────────────
    let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(1);

    {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("shutdown signal received");
            let _ = shutdown.send(());
        });
    }

    // ── Spawn tasks ──────────────────────────────────────────────────────────

    let peer_listener = listener::bind(config.network.peer_port)
        .with_context(|| format!("failed to bind peer port {}", config.network.peer_port))?;
    let listener_task = tokio::spawn(listener::accept_loop(
        transport.clone(),
        peer_listener,
        shutdown_tx.subscribe(),
    ));

    let dialer_task = tokio::spawn(dialer::dial_loop(
        transport.clone(),
        dial_rx,
        config.network.connect_timeout(),
        shutdown_tx.subscribe(),
    ));

    let gossip_task = tokio::spawn(gossip::gossip_loop(
        transport.clone(),
        config.gossip.interval(),
        shutdown_tx.subscribe(),
    ));

    let api_task = {
        let state = swarm_api::ApiState {
            service: service.clone(),
            shutdown_tx: shutdown_tx.clone(),
        };
        let port = config.network.http_port;
        tokio::spawn(async move {
            if let Err(e) = swarm_api::serve(state, port).await {
                tracing::error!(error = %e, "api server failed");
            }
        })
    };

    for peer in &config.network.bootstrap_peers {
        match parse_peer(peer) {
            Some((host, port)) => registry.bootstrap(host, port),
            None => tracing::warn!(peer = %peer, "ignoring malformed bootstrap peer"),
        }
    }

    service.start();

    // ── Wait for exit ────────────────────────────────────────────────────────

    let mut shutdown_rx = shutdown_tx.subscribe();

    tokio::select! {
        _ = shutdown_rx.recv() => tracing::info!("shutting down"),
        r = listener_task      => tracing::error!("peer listener exited: {:?}", r),
        r = dialer_task        => tracing::error!("dialer exited: {:?}", r),
        r = gossip_task        => tracing::error!("gossip exited: {:?}", r),
        r = api_task           => tracing::error!("api server exited: {:?}", r),
    }

    service.stop();
    service.join().await;
    let _ = shutdown_tx.send(());
    Ok(())
}

/// Positional overrides: peer port, http port, public key.
fn apply_args(config: &mut SwarmConfig, mut args: impl Iterator<Item = String>) -> Result<()> {
    if let Some(port) = args.next() {
        config.network.peer_port = port
            .parse()
            .with_context(|| format!("invalid peer port: {port}"))?;
    }
    if let Some(port) = args.next() {
        config.network.http_port = port
            .parse()
            .with_context(|| format!("invalid http port: {port}"))?;
    }
    if let Some(key) = args.next() {
        config.identity.public_key = key;
    }
    Ok(())
}

/// Split `host:port`.
fn parse_peer(peer: &str) -> Option<(&str, u16)> {
    let (host, port) = peer.trim().rsplit_once(':')?;
    let port = port.parse().ok()?;
    (!host.is_empty() && port != 0).then_some((host, port))
}
