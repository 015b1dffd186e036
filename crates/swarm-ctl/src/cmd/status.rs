//! Daemon status and shutdown commands.

use anyhow::Result;
use serde::Deserialize;

use super::http::{base_url, get_json, post_json};

#[derive(Deserialize)]
struct StatusResponse {
    public_key: String,
    state: String,
    server_peers: usize,
    client_peers: usize,
    suggestions: usize,
    desired_connectivity: usize,
}

#[derive(Deserialize)]
struct ShutdownResponse {
    message: String,
}

pub async fn cmd_status(port: u16) -> Result<()> {
    let resp: StatusResponse = get_json(&format!("{}/status", base_url(port))).await?;

    println!("═══════════════════════════════════════");
    println!("  Swarm Node Status");
    println!("═══════════════════════════════════════");
    println!("  Public key      : {}", resp.public_key);
    println!("  Discovery       : {}", resp.state);
    println!("  Inbound peers   : {}", resp.server_peers);
    println!("  Outbound peers  : {}", resp.client_peers);
    println!("  Suggestions     : {}", resp.suggestions);
    println!("  Target peers    : {}", resp.desired_connectivity);

    Ok(())
}

pub async fn cmd_shutdown(port: u16) -> Result<()> {
    let resp: ShutdownResponse = post_json(&format!("{}/daemon/shutdown", base_url(port))).await?;
    println!("{}", resp.message);
    Ok(())
}
