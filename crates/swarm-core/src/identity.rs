//! Node identity generation.

use rand::RngCore;

use crate::node::PublicKey;

/// Bytes of entropy behind a generated identity.
pub const IDENTITY_LEN: usize = 32;

/// Generate a fresh random identity, hex-encoded.
pub fn generate_public_key() -> PublicKey {
    let mut bytes = [0u8; IDENTITY_LEN];
    rand::thread_rng().fill_bytes(&mut bytes);
    PublicKey::new(hex::encode(bytes))
}

/// Use `configured` if non-empty, otherwise generate a new identity.
pub fn resolve_public_key(configured: &str) -> PublicKey {
    if configured.is_empty() {
        generate_public_key()
    } else {
        PublicKey::new(configured)
    }
}
