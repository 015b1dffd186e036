//! Configuration system for the swarm node.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $SWARM_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/swarm/config.toml
//!   3. ~/.config/swarm/config.toml

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::node::LOOPBACK_HOST;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SwarmConfig {
    pub identity: IdentityConfig,
    pub network: NetworkConfig,
    pub discovery: DiscoveryConfig,
    pub gossip: GossipConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// This node's public key. Empty = generate a fresh identity at startup.
    pub public_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// TCP port for peer connections.
    pub peer_port: u16,
    /// TCP port for the HTTP introspection API.
    pub http_port: u16,
    /// Host placed in this node's own entry point.
    pub advertise_host: String,
    /// `host:port` peers dialled once at startup.
    pub bootstrap_peers: Vec<String>,
    /// Outbound connect timeout.
    pub connect_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Wait before each discovery iteration.
    pub interval_ms: u64,
    /// Target number of distinct identities known, self included.
    pub desired_connectivity: usize,
    /// Fixed seed for candidate shuffling. None = OS entropy.
    pub shuffle_seed: Option<u64>,
    /// Upper bound on the gossip suggestion pool.
    pub max_suggestions: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GossipConfig {
    /// How often known peers are pushed to every connection.
    pub interval_ms: u64,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            peer_port: 8000,
            http_port: 8080,
            advertise_host: LOOPBACK_HOST.to_string(),
            bootstrap_peers: Vec::new(),
            connect_timeout_ms: 5000,
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            interval_ms: 2000,
            desired_connectivity: 5,
            shuffle_seed: None,
            max_suggestions: 1024,
        }
    }
}

impl Default for GossipConfig {
    fn default() -> Self {
        Self { interval_ms: 5000 }
    }
}

impl DiscoveryConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl GossipConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl NetworkConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("swarm")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl SwarmConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::file_path();
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadFailed(path.clone(), e))?;
            toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.clone(), e))?
        } else {
            SwarmConfig::default()
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("SWARM_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = toml::to_string_pretty(&SwarmConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(&path, text).map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    /// Apply SWARM_* overrides. `lookup` returns the value of a variable if set.
    fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("SWARM_IDENTITY__PUBLIC_KEY") {
            self.identity.public_key = v;
        }
        if let Some(p) = lookup("SWARM_NETWORK__PEER_PORT").and_then(|v| v.parse().ok()) {
            self.network.peer_port = p;
        }
        if let Some(p) = lookup("SWARM_NETWORK__HTTP_PORT").and_then(|v| v.parse().ok()) {
            self.network.http_port = p;
        }
        if let Some(v) = lookup("SWARM_NETWORK__ADVERTISE_HOST") {
            self.network.advertise_host = v;
        }
        if let Some(ms) = lookup("SWARM_DISCOVERY__INTERVAL_MS").and_then(|v| v.parse().ok()) {
            self.discovery.interval_ms = ms;
        }
        if let Some(n) =
            lookup("SWARM_DISCOVERY__DESIRED_CONNECTIVITY").and_then(|v| v.parse().ok())
        {
            self.discovery.desired_connectivity = n;
        }
        if let Some(seed) = lookup("SWARM_DISCOVERY__SHUFFLE_SEED").and_then(|v| v.parse().ok()) {
            self.discovery.shuffle_seed = Some(seed);
        }
    }
}
