//! Ed25519 signing and verification over transaction digests.

use aegis_types::{PrivateKey, PublicKey, Signature};
use ed25519_dalek::{Signer, SigningKey, VerifyingKey};

/// Sign a message with a private key. Ed25519 signing is deterministic.
pub fn sign_message(message: &[u8], private_key: &PrivateKey) -> Signature {
    let signing_key = SigningKey::from_bytes(&private_key.0);
    Signature(signing_key.sign(message).to_bytes())
}

/// Verify a signature against a message and public key.
///
/// Uses strict verification: weak public keys and non-canonical signatures
/// are rejected.
pub fn verify_signature(message: &[u8], signature: &Signature, public_key: &PublicKey) -> bool {
    let Ok(verifying_key) = VerifyingKey::from_bytes(&public_key.0) else {
        return false;
    };
    let dalek_sig = ed25519_dalek::Signature::from_bytes(&signature.0);
    verifying_key.verify_strict(message, &dalek_sig).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{generate_keypair, keypair_from_seed};

    #[test]
    fn sign_and_verify_digest() {
        let kp = generate_keypair();
        let digest = crate::blake2b_256(b"raw transaction bytes");
        let sig = sign_message(&digest, &kp.private);
        assert!(verify_signature(&digest, &sig, &kp.public));
    }

    #[test]
    fn other_digest_fails() {
        let kp = generate_keypair();
        let sig = sign_message(&[1u8; 32], &kp.private);
        assert!(!verify_signature(&[2u8; 32], &sig, &kp.public));
    }

    #[test]
    fn other_key_fails() {
        let kp1 = generate_keypair();
        let kp2 = generate_keypair();
        let sig = sign_message(b"digest", &kp1.private);
        assert!(!verify_signature(b"digest", &sig, &kp2.public));
    }

    #[test]
    fn signature_is_deterministic() {
        let kp = keypair_from_seed(&[99u8; 32]);
        let sig1 = sign_message(b"same digest", &kp.private);
        let sig2 = sign_message(b"same digest", &kp.private);
        assert_eq!(sig1, sig2);
    }

    #[test]
    fn garbage_public_key_fails_closed() {
        let kp = generate_keypair();
        let sig = sign_message(b"test", &kp.private);
        assert!(!verify_signature(b"test", &sig, &PublicKey([0xFF; 32])));
    }

    #[test]
    fn zeroed_signature_fails() {
        let kp = generate_keypair();
        assert!(!verify_signature(b"test", &Signature([0u8; 64]), &kp.public));
    }
}
