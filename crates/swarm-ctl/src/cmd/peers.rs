//! Connected peers and the suggestion pool.

use anyhow::Result;
use serde::Deserialize;

use super::http::{base_url, get_json};
use super::short_key;

#[derive(Deserialize)]
struct PeersResponse {
    server_peers: Vec<PeerInfo>,
    client_peers: Vec<PeerInfo>,
}

#[derive(Deserialize)]
struct PeerInfo {
    connection_id: u64,
    address: Option<String>,
    details: NodeSummary,
}

#[derive(Deserialize)]
struct NodeSummary {
    public_key: String,
    entry_points: Vec<EntryPointSummary>,
}

#[derive(Deserialize)]
struct EntryPointSummary {
    host: String,
    port: u16,
    #[serde(default)]
    configuration: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
struct SuggestionsResponse {
    suggestions: Vec<NodeSummary>,
}

fn print_peer(direction: &str, p: &PeerInfo) {
    println!("  ┌─ {} ({})", short_key(&p.details.public_key), direction);
    println!("  │  connection : {}", p.connection_id);
    println!(
        "  └─ address    : {}",
        p.address.as_deref().unwrap_or("unknown")
    );
}

pub async fn cmd_peers(port: u16) -> Result<()> {
    let resp: PeersResponse = get_json(&format!("{}/peers", base_url(port))).await?;

    let total = resp.server_peers.len() + resp.client_peers.len();
    if total == 0 {
        println!("No connected peers.");
        return Ok(());
    }

    println!("═══════════════════════════════════════");
    println!("  Connected Peers ({})", total);
    println!("═══════════════════════════════════════");
    for p in &resp.server_peers {
        print_peer("inbound", p);
    }
    for p in &resp.client_peers {
        print_peer("outbound", p);
    }

    Ok(())
}

pub async fn cmd_suggestions(port: u16) -> Result<()> {
    let resp: SuggestionsResponse = get_json(&format!("{}/suggestions", base_url(port))).await?;

    if resp.suggestions.is_empty() {
        println!("No suggested peers yet.");
        return Ok(());
    }

    println!("═══════════════════════════════════════");
    println!("  Suggested Peers ({})", resp.suggestions.len());
    println!("═══════════════════════════════════════");
    for s in &resp.suggestions {
        println!("  ┌─ {}", short_key(&s.public_key));
        let last = s.entry_points.len().saturating_sub(1);
        for (i, e) in s.entry_points.iter().enumerate() {
            let branch = if i == last { "└─" } else { "│ " };
            println!(
                "  {} {}:{} ({} tags)",
                branch,
                e.host,
                e.port,
                e.configuration.len()
            );
        }
        if s.entry_points.is_empty() {
            println!("  └─ no entry points");
        }
    }

    Ok(())
}
