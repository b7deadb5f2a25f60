//! Ed25519 key generation and import.

use aegis_types::{KeyPair, ParseError, PrivateKey, PublicKey};
use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use zeroize::Zeroize;

/// Generate a new Ed25519 key pair from a secure random source.
pub fn generate_keypair() -> KeyPair {
    let signing_key = SigningKey::generate(&mut OsRng);
    let verifying_key = signing_key.verifying_key();
    KeyPair {
        public: PublicKey(verifying_key.to_bytes()),
        private: PrivateKey(signing_key.to_bytes()),
    }
}

/// Derive the public key from a private key.
pub fn public_from_private(private: &PrivateKey) -> PublicKey {
    let signing_key = SigningKey::from_bytes(&private.0);
    let verifying_key = signing_key.verifying_key();
    PublicKey(verifying_key.to_bytes())
}

/// Reconstruct a full key pair from a private key.
pub fn keypair_from_private(private: PrivateKey) -> KeyPair {
    let public = public_from_private(&private);
    KeyPair { public, private }
}

/// Derive a key pair from a 32-byte seed (deterministic).
pub fn keypair_from_seed(seed: &[u8; 32]) -> KeyPair {
    keypair_from_private(PrivateKey(*seed))
}

/// Import a key pair from a hex-encoded 32-byte private key.
///
/// Accepts bare hex, `0x`-prefixed hex, and the `ed25519-priv-0x` prefix
/// some ledger tooling writes.
pub fn keypair_from_hex(private_key_hex: &str) -> Result<KeyPair, ParseError> {
    let trimmed = private_key_hex.trim();
    let digits = trimmed
        .strip_prefix("ed25519-priv-")
        .unwrap_or(trimmed);
    let digits = digits.strip_prefix("0x").unwrap_or(digits);

    let mut bytes = [0u8; 32];
    hex::decode_to_slice(digits, &mut bytes).map_err(|e| {
        ParseError::Key(format!("private key must be 32 hex-encoded bytes: {e}"))
    })?;
    let keypair = keypair_from_private(PrivateKey(bytes));
    bytes.zeroize();
    Ok(keypair)
}
