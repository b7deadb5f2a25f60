//! Signing side of delegated authorization.
//!
//! - [`AuthenticatorEnvelope`]: `public_key ‖ signature` proof bytes
//! - [`DigestSigner`]: single-method signing capability (in-memory key, HSM, remote)
//! - [`AbstractedSigner`]: signs for an owner account with a delegate's capability
//! - [`TransactionSigner`]: anything that can authorize a transaction digest
//!   ([`LocalAccount`] with its own key, or an [`AbstractedSigner`])

pub mod abstracted;
pub mod authenticator;
pub mod capability;
pub mod envelope;
pub mod error;

pub use abstracted::AbstractedSigner;
pub use authenticator::{LocalAccount, TransactionAuthenticator, TransactionSigner};
pub use capability::{DigestSigner, KeySigner};
pub use envelope::{AuthenticatorEnvelope, EnvelopeError};
pub use error::SignerError;

/// Length of every transaction signing digest (Blake2b-256).
pub const DIGEST_LEN: usize = 32;

/// Reject digests that are empty or not [`DIGEST_LEN`] bytes.
pub fn check_digest(digest: &[u8]) -> Result<(), SignerError> {
    if digest.len() != DIGEST_LEN {
        return Err(SignerError::InvalidDigest {
            expected: DIGEST_LEN,
            actual: digest.len(),
        });
    }
    Ok(())
}
