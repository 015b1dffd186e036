//! CLI command modules.

pub mod bootstrap;
pub mod http;
pub mod node;
pub mod peers;
pub mod status;

/// Leading 16 characters of a public key, for table output.
pub fn short_key(key: &str) -> &str {
    key.get(..16).unwrap_or(key)
}
