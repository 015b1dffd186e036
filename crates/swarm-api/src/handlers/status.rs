//! /status, /node, /node/address, /daemon/shutdown handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use swarm_core::NodeDetails;
use swarm_services::LifecycleState;

use super::{parse_host, ApiState};

// ── /status ──────────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct StatusResponse {
    pub public_key: String,
    pub state: LifecycleState,
    pub server_peers: usize,
    pub client_peers: usize,
    pub suggestions: usize,
    pub desired_connectivity: usize,
}

pub async fn handle_status(State(state): State<ApiState>) -> Json<StatusResponse> {
    let service = &state.service;
    let (server_peers, client_peers, suggestions) = service.registry().with_snapshot(|t| {
        (
            t.server_peers.len(),
            t.client_peers.len(),
            t.suggestions.len(),
        )
    });

    Json(StatusResponse {
        public_key: service.public_key().to_string(),
        state: service.state(),
        server_peers,
        client_peers,
        suggestions,
        desired_connectivity: service.settings().desired_connectivity,
    })
}

// ── /node ─────────────────────────────────────────────────────────────────────

pub async fn handle_node(State(state): State<ApiState>) -> Json<NodeDetails> {
    Json(state.service.details().details())
}

// ── /node/address ─────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct SetAddressRequest {
    pub host: String,
}

#[derive(Serialize)]
pub struct SetAddressResponse {
    pub host: String,
    pub rewritten: usize,
}

pub async fn handle_set_address(
    State(state): State<ApiState>,
    Json(req): Json<SetAddressRequest>,
) -> Result<Json<SetAddressResponse>, (StatusCode, String)> {
    let host = parse_host(&req.host)?;
    let rewritten = state.service.set_advertised_host(host);
    Ok(Json(SetAddressResponse {
        host: host.to_string(),
        rewritten,
    }))
}

// ── /daemon/shutdown ──────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct ShutdownResponse {
    pub message: String,
}

pub async fn handle_shutdown(State(state): State<ApiState>) -> Json<ShutdownResponse> {
    tracing::info!("shutdown requested via API");
    state.service.stop();
    let _ = state.shutdown_tx.send(());

    Json(ShutdownResponse {
        message: "Shutdown initiated".to_string(),
    })
}
