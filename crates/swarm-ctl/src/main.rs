//! swarm-ctl: command-line interface for the swarm daemon.

use anyhow::{Context, Result};

mod cmd;

const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Status,
    Node,
    Peers,
    Suggestions,
    Bootstrap { host: String, port: u16 },
    SetAddress { host: String },
    Shutdown,
    Help,
}

fn print_usage() {
    println!("Usage: swarm-ctl [--port <port>] <command>");
    println!();
    println!("Commands:");
    println!("  status                    Show node status and peer counts");
    println!("  node                      Print this node's details");
    println!("  peers                     List connected peers");
    println!("  suggestions               List suggested peers");
    println!("  bootstrap <host> <port>   Dial a peer");
    println!("  set-address <host>        Set the advertised host");
    println!("  shutdown                  Stop the daemon");
    println!();
    println!("Options:");
    println!("  --port <port>   API port (default: {})", DEFAULT_PORT);
}

/// Split `--port` from the command words.
fn parse_args(args: &[String]) -> Result<(u16, Option<Command>)> {
    let mut port = DEFAULT_PORT;
    let mut remaining: Vec<&str> = Vec::new();
    let mut i = 0;
    while i < args.len() {
        if args[i] == "--port" {
            i += 1;
            port = args
                .get(i)
                .context("--port requires a value")?
                .parse()
                .context("--port must be a number")?;
        } else {
            remaining.push(&args[i]);
        }
        i += 1;
    }

    let command = match remaining.as_slice() {
        ["status"] | [] => Command::Status,
        ["node"] => Command::Node,
        ["peers"] => Command::Peers,
        ["suggestions"] => Command::Suggestions,
        ["bootstrap", host, peer_port] => Command::Bootstrap {
            host: host.to_string(),
            port: peer_port.parse().context("peer port must be a number")?,
        },
        ["set-address", host] => Command::SetAddress {
            host: host.to_string(),
        },
        ["shutdown"] => Command::Shutdown,
        ["help"] | ["--help"] | ["-h"] => Command::Help,
        other => {
            eprintln!("Unknown command: {}", other.join(" "));
            return Ok((port, None));
        }
    };
    Ok((port, Some(command)))
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let (port, command) = parse_args(&args)?;
    let Some(command) = command else {
        eprintln!();
        print_usage();
        std::process::exit(1);
    };

    match command {
        Command::Status => cmd::status::cmd_status(port).await,
        Command::Node => cmd::node::cmd_node(port).await,
        Command::Peers => cmd::peers::cmd_peers(port).await,
        Command::Suggestions => cmd::peers::cmd_suggestions(port).await,
        Command::Bootstrap { host, port: peer_port } => {
            cmd::bootstrap::cmd_bootstrap(port, &host, peer_port).await
        }
        Command::SetAddress { host } => cmd::node::cmd_set_address(port, &host).await,
        Command::Shutdown => cmd::status::cmd_shutdown(port).await,
        Command::Help => {
            print_usage();
            Ok(())
        }
    }
}
