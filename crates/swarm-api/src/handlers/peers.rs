//! /peers, /suggestions, /bootstrap handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use swarm_core::NodeDetails;
use swarm_services::{ConnectionId, PeerRegistry};

use super::{parse_host, ApiState};

// ── /peers ────────────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct PeersResponse {
    pub server_peers: Vec<PeerInfo>,
    pub client_peers: Vec<PeerInfo>,
}

#[derive(Serialize)]
pub struct PeerInfo {
    pub connection_id: ConnectionId,
    /// Transport address of the connection, if still live.
    pub address: Option<String>,
    pub details: NodeDetails,
}

fn peer_infos(registry: &PeerRegistry, peers: Vec<(ConnectionId, NodeDetails)>) -> Vec<PeerInfo> {
    peers
        .into_iter()
        .map(|(connection_id, details)| PeerInfo {
            connection_id,
            address: registry.resolve_client_address(connection_id),
            details,
        })
        .collect()
}

pub async fn handle_peers(State(state): State<ApiState>) -> Json<PeersResponse> {
    let registry = state.service.registry();
    let (server, client) = registry.with_snapshot(|t| {
        let collect = |m: &std::collections::BTreeMap<ConnectionId, NodeDetails>| {
            m.iter().map(|(id, d)| (*id, d.clone())).collect::<Vec<_>>()
        };
        (collect(&t.server_peers), collect(&t.client_peers))
    });

    Json(PeersResponse {
        server_peers: peer_infos(registry, server),
        client_peers: peer_infos(registry, client),
    })
}

// ── /suggestions ──────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct SuggestionsResponse {
    pub suggestions: Vec<NodeDetails>,
}

pub async fn handle_suggestions(State(state): State<ApiState>) -> Json<SuggestionsResponse> {
    let suggestions = state.service.registry().with_suggestions(|s| s.to_vec());
    Json(SuggestionsResponse { suggestions })
}

// ── /bootstrap ────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct BootstrapRequest {
    pub host: String,
    pub port: u16,
}

#[derive(Serialize)]
pub struct BootstrapResponse {
    pub requested: String,
}

pub async fn handle_bootstrap(
    State(state): State<ApiState>,
    Json(req): Json<BootstrapRequest>,
) -> Result<Json<BootstrapResponse>, (StatusCode, String)> {
    let host = parse_host(&req.host)?;
    if req.port == 0 {
        return Err((StatusCode::BAD_REQUEST, "port must be non-zero".to_string()));
    }

    tracing::info!(host, port = req.port, "bootstrap requested via API");
    state.service.registry().bootstrap(host, req.port);

    Ok(Json(BootstrapResponse {
        requested: format!("{}:{}", host, req.port),
    }))
}
