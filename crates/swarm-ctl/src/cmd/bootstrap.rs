//! Manual bootstrap.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::http::{base_url, post_json_body};

#[derive(Serialize)]
struct BootstrapRequest<'a> {
    host: &'a str,
    port: u16,
}

#[derive(Deserialize)]
struct BootstrapResponse {
    requested: String,
}

pub async fn cmd_bootstrap(port: u16, host: &str, peer_port: u16) -> Result<()> {
    let resp: BootstrapResponse = post_json_body(
        &format!("{}/bootstrap", base_url(port)),
        &BootstrapRequest {
            host,
            port: peer_port,
        },
    )
    .await?;
    println!("Dial queued for {}.", resp.requested);
    Ok(())
}
