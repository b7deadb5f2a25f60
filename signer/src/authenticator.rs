//! Transaction authenticators and the signer trait consumed by submission.

use serde::{Deserialize, Serialize};

use aegis_crypto::derive_address;
use aegis_types::{AccountAddress, FunctionRef, KeyPair, PublicKey, Signature};

use crate::capability::{DigestSigner, KeySigner};
use crate::error::SignerError;

/// Proof attached to a submitted transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionAuthenticator {
    /// The sender's own key signed the digest.
    Ed25519 {
        public_key: PublicKey,
        signature: Signature,
    },
    /// The sender's bound authentication function must accept `envelope`.
    Abstraction {
        function: FunctionRef,
        envelope: Vec<u8>,
    },
}

/// A signer for a given sender account.
pub trait TransactionSigner: Send + Sync {
    /// The account this signer authorizes transactions for.
    fn address(&self) -> AccountAddress;

    /// Produce the authenticator for a transaction signing digest.
    fn authenticate(&self, digest: &[u8]) -> Result<TransactionAuthenticator, SignerError>;
}

/// An account that signs with its own key.
pub struct LocalAccount {
    address: AccountAddress,
    signer: KeySigner,
}

impl LocalAccount {
    pub fn new(keys: KeyPair) -> Self {
        let address = derive_address(&keys.public);
        Self {
            address,
            signer: KeySigner::new(keys),
        }
    }

    pub fn generate() -> Self {
        Self::new(aegis_crypto::generate_keypair())
    }

    pub fn public_key(&self) -> PublicKey {
        self.signer.public_key()
    }

    pub fn key_signer(&self) -> &KeySigner {
        &self.signer
    }
}

impl TransactionSigner for LocalAccount {
    fn address(&self) -> AccountAddress {
        self.address
    }

    fn authenticate(&self, digest: &[u8]) -> Result<TransactionAuthenticator, SignerError> {
        crate::check_digest(digest)?;
        Ok(TransactionAuthenticator::Ed25519 {
            public_key: self.signer.public_key(),
            signature: self.signer.sign(digest)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aegis_crypto::{keypair_from_seed, verify_signature};

    #[test]
    fn local_account_address_is_derived_from_key() {
        let account = LocalAccount::new(keypair_from_seed(&[3u8; 32]));
        assert_eq!(account.address(), derive_address(&account.public_key()));
    }

    #[test]
    fn local_account_signs_with_own_key() {
        let account = LocalAccount::generate();
        let digest = [8u8; 32];
        match account.authenticate(&digest).unwrap() {
            TransactionAuthenticator::Ed25519 { public_key, signature } => {
                assert_eq!(public_key, account.public_key());
                assert!(verify_signature(&digest, &signature, &public_key));
            }
            other => panic!("unexpected authenticator: {other:?}"),
        }
    }

    #[test]
    fn local_account_rejects_short_digest() {
        let account = LocalAccount::generate();
        assert!(matches!(
            account.authenticate(b"short"),
            Err(SignerError::InvalidDigest { .. })
        ));
    }
}
