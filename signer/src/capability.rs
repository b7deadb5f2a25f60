//! Signing capability: the one thing a delegate has to provide.
//!
//! Keeps [`AbstractedSigner`](crate::AbstractedSigner) independent of where
//! the key lives (memory, hardware, a remote signer).

use aegis_crypto::{generate_keypair, keypair_from_hex, sign_message};
use aegis_types::{KeyPair, ParseError, PublicKey, Signature};

use crate::error::SignerError;

pub trait DigestSigner: Send + Sync {
    /// Public half of the signing key; written into every envelope.
    fn public_key(&self) -> PublicKey;

    /// Sign `digest`. Called once per authorization, never cached.
    fn sign(&self, digest: &[u8]) -> Result<Signature, SignerError>;
}

/// In-memory Ed25519 key.
pub struct KeySigner {
    keys: KeyPair,
}

impl KeySigner {
    pub fn new(keys: KeyPair) -> Self {
        Self { keys }
    }

    pub fn generate() -> Self {
        Self::new(generate_keypair())
    }

    pub fn from_hex(private_key_hex: &str) -> Result<Self, ParseError> {
        keypair_from_hex(private_key_hex).map(Self::new)
    }

    pub fn keys(&self) -> &KeyPair {
        &self.keys
    }
}

impl DigestSigner for KeySigner {
    fn public_key(&self) -> PublicKey {
        self.keys.public
    }

    fn sign(&self, digest: &[u8]) -> Result<Signature, SignerError> {
        Ok(sign_message(digest, &self.keys.private))
    }
}
