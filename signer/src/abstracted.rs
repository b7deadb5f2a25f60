//! Signer for an abstracted account, backed by a delegate's capability.

use std::fmt;
use std::sync::Arc;

use aegis_types::{AccountAddress, FunctionRef, PublicKey};

use crate::authenticator::{TransactionAuthenticator, TransactionSigner};
use crate::capability::DigestSigner;
use crate::envelope::AuthenticatorEnvelope;
use crate::error::SignerError;

/// Authorizes transactions *sent by* `owner` using a delegate's key.
///
/// The ledger hands every digest to `function`, which checks the resulting
/// envelope against the owner's grant. This type performs no grant checks of
/// its own and never touches the network.
#[derive(Clone)]
pub struct AbstractedSigner {
    owner: AccountAddress,
    function: FunctionRef,
    signer: Arc<dyn DigestSigner>,
}

impl AbstractedSigner {
    pub fn new(owner: AccountAddress, function: FunctionRef, signer: Arc<dyn DigestSigner>) -> Self {
        Self {
            owner,
            function,
            signer,
        }
    }

    pub fn owner(&self) -> &AccountAddress {
        &self.owner
    }

    pub fn function(&self) -> &FunctionRef {
        &self.function
    }

    pub fn delegate_public_key(&self) -> PublicKey {
        self.signer.public_key()
    }

    /// Sign `digest` with the delegate key and wrap it in an envelope.
    ///
    /// Invokes the capability exactly once per call.
    pub fn authorize(&self, digest: &[u8]) -> Result<AuthenticatorEnvelope, SignerError> {
        crate::check_digest(digest)?;
        let signature = self.signer.sign(digest).map_err(|e| match e {
            SignerError::SigningFailure(_) => e,
            other => SignerError::SigningFailure(other.to_string()),
        })?;
        tracing::trace!(owner = %self.owner, "delegate signed digest");
        Ok(AuthenticatorEnvelope::new(self.signer.public_key(), signature))
    }
}

impl TransactionSigner for AbstractedSigner {
    fn address(&self) -> AccountAddress {
        self.owner
    }

    fn authenticate(&self, digest: &[u8]) -> Result<TransactionAuthenticator, SignerError> {
        let envelope = self.authorize(digest)?;
        Ok(TransactionAuthenticator::Abstraction {
            function: self.function.clone(),
            envelope: envelope.to_bytes(),
        })
    }
}

impl fmt::Debug for AbstractedSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbstractedSigner")
            .field("owner", &self.owner)
            .field("function", &self.function.to_string())
            .field("delegate", &self.signer.public_key())
            .finish()
    }
}
