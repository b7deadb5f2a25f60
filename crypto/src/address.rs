//! Account address derivation from public keys.
//!
//! `address = blake2b_256(public_key || scheme)` where `scheme` is the
//! one-byte signature scheme tag. Only Ed25519 single keys exist here.

use aegis_types::{AccountAddress, PublicKey};

/// Scheme tag appended to an Ed25519 public key before hashing.
pub const ED25519_SCHEME: u8 = 0x00;

/// Derive the account address controlled by `public_key`.
pub fn derive_address(public_key: &PublicKey) -> AccountAddress {
    AccountAddress::new(crate::blake2b_256_multi(&[
        public_key.as_bytes(),
        &[ED25519_SCHEME],
    ]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{generate_keypair, keypair_from_seed};

    #[test]
    fn derive_is_deterministic() {
        let kp = keypair_from_seed(&[7u8; 32]);
        assert_eq!(derive_address(&kp.public), derive_address(&kp.public));
    }

    #[test]
    fn address_is_not_the_raw_key() {
        let kp = generate_keypair();
        assert_ne!(derive_address(&kp.public).as_bytes(), kp.public.as_bytes());
    }

    #[test]
    fn different_keys_different_addresses() {
        let k1 = generate_keypair();
        let k2 = generate_keypair();
        assert_ne!(derive_address(&k1.public), derive_address(&k2.public));
    }
}
