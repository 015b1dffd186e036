//! This node's own details.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::http::{base_url, get_json, post_json_body};

#[derive(Serialize)]
struct SetAddressRequest<'a> {
    host: &'a str,
}

#[derive(Deserialize)]
struct SetAddressResponse {
    host: String,
    rewritten: usize,
}

pub async fn cmd_node(port: u16) -> Result<()> {
    let resp: serde_json::Value = get_json(&format!("{}/node", base_url(port))).await?;
    println!("{}", serde_json::to_string_pretty(&resp)?);
    Ok(())
}

pub async fn cmd_set_address(port: u16, host: &str) -> Result<()> {
    let resp: SetAddressResponse = post_json_body(
        &format!("{}/node/address", base_url(port)),
        &SetAddressRequest { host },
    )
    .await?;

    if resp.rewritten == 0 {
        println!("No placeholder entry points left; {} not applied.", resp.host);
    } else {
        println!("Advertising {} on {} entry point(s).", resp.host, resp.rewritten);
    }
    Ok(())
}
