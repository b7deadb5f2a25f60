//! Nullable signing capability: records digests, fails on demand.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use aegis_signer::{DigestSigner, KeySigner, SignerError};
use aegis_types::{PublicKey, Signature};

/// A real Ed25519 key that remembers every digest it signed.
pub struct NullSigner {
    key: KeySigner,
    signed: Mutex<Vec<Vec<u8>>>,
    fail: AtomicBool,
}

impl NullSigner {
    pub fn new(key: KeySigner) -> Self {
        Self {
            key,
            signed: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        }
    }

    pub fn generate() -> Self {
        Self::new(KeySigner::generate())
    }

    /// While set, `sign` fails with `SigningFailure`.
    pub fn fail_signing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Digests signed so far, oldest first.
    pub fn signed(&self) -> Vec<Vec<u8>> {
        self.signed.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl DigestSigner for NullSigner {
    fn public_key(&self) -> PublicKey {
        self.key.public_key()
    }

    fn sign(&self, digest: &[u8]) -> Result<Signature, SignerError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(SignerError::SigningFailure("injected signing failure".into()));
        }
        let signature = self.key.sign(digest)?;
        if let Ok(mut signed) = self.signed.lock() {
            signed.push(digest.to_vec());
        }
        Ok(signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_and_fails_on_demand() {
        let signer = NullSigner::generate();
        signer.sign(&[1u8; 32]).unwrap();
        signer.fail_signing(true);
        assert!(signer.sign(&[2u8; 32]).is_err());
        assert_eq!(signer.signed(), vec![vec![1u8; 32]]);
    }
}
