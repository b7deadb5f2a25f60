//! Envelope checks against stored delegation state.

use aegis_crypto::verify_signature;
use aegis_signer::AuthenticatorEnvelope;
use aegis_store::DelegationStore;
use aegis_types::{AccountAddress, AuthError, DelegationState, Timestamp};

use crate::error::VerificationError;

/// Decide whether `envelope_bytes` authorizes a transaction from `sender`
/// with signing digest `digest`, as of `now`.
pub fn authenticate(
    store: &dyn DelegationStore,
    sender: &AccountAddress,
    digest: &[u8],
    envelope_bytes: &[u8],
    now: Timestamp,
) -> Result<(), VerificationError> {
    let state = store.get_delegation(sender)?;
    check_envelope(&state, digest, envelope_bytes, now).map_err(|e| {
        tracing::debug!(%sender, error = %e, "delegated authentication rejected");
        VerificationError::from(e)
    })
}

/// The pure part of [`authenticate`]: no store, no clock.
pub fn check_envelope(
    state: &DelegationState,
    digest: &[u8],
    envelope_bytes: &[u8],
    now: Timestamp,
) -> Result<(), AuthError> {
    let envelope = AuthenticatorEnvelope::from_bytes(envelope_bytes)?;

    let grant = state
        .active_grant_at(now)
        .ok_or(AuthError::NoActiveDelegation)?;

    if envelope.public_key != grant.delegate_public_key {
        return Err(AuthError::DelegateMismatch);
    }

    if !verify_signature(digest, &envelope.signature, &envelope.public_key) {
        return Err(AuthError::BadSignature);
    }

    Ok(())
}
