//! Cryptographic primitives for Aegis.
//!
//! - **Ed25519** for signing and signature verification
//! - **Blake2b-256** for transaction digests and address derivation
//! - Address derivation: `blake2b_256(public_key || 0x00)`

pub mod address;
pub mod hash;
pub mod keys;
pub mod sign;

pub use address::{derive_address, ED25519_SCHEME};
pub use hash::{blake2b_256, blake2b_256_multi};
pub use keys::{
    generate_keypair, keypair_from_hex, keypair_from_private, keypair_from_seed,
    public_from_private,
};
pub use sign::{sign_message, verify_signature};
