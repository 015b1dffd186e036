//! HTTP API handlers: exposes swarm state as JSON.

pub mod peers;
pub mod status;

use axum::http::StatusCode;

use swarm_services::SwarmService;

#[derive(Clone)]
pub struct ApiState {
    pub service: SwarmService,
    /// Shutdown broadcast sender: signals graceful daemon shutdown.
    pub shutdown_tx: tokio::sync::broadcast::Sender<()>,
}

// ── Shared helpers ────────────────────────────────────────────────────────────

/// Reject empty or whitespace-only hosts.
fn parse_host(host: &str) -> Result<&str, (StatusCode, String)> {
    let host = host.trim();
    if host.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "host must not be empty".to_string()));
    }
    if host.contains(char::is_whitespace) {
        return Err((
            StatusCode::BAD_REQUEST,
            "host must not contain whitespace".to_string(),
        ));
    }
    Ok(host)
}

// Re-export handler functions for use in router setup.
pub use peers::{handle_bootstrap, handle_peers, handle_suggestions};
pub use status::{handle_node, handle_set_address, handle_shutdown, handle_status};
