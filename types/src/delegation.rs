//! Delegation grants and the per-owner grant state machine.
//!
//! ```text
//! NoGrant ──grant──▶ Active(expires_at) ──grant──▶ Active(new)   (superseded)
//!                        │   └──revoke──▶ Revoked
//!                        └── now >= expires_at ──▶ Expired         (derived, never stored)
//! ```
//!
//! Expiry is evaluated lazily on every check. An expired grant stays stored
//! until it is superseded or revoked, but every validity query rejects it.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::address::AccountAddress;
use crate::function::FunctionRef;
use crate::keys::PublicKey;
use crate::time::Timestamp;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum GrantError {
    #[error("delegation duration must be positive")]
    NonPositiveDuration,

    #[error("delegation of {duration_secs}s from {now} overflows the timestamp range")]
    ExpiryOverflow { now: Timestamp, duration_secs: u64 },
}

/// "Who may sign for `delegator`, until when."
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationGrant {
    pub delegator: AccountAddress,
    pub delegate_public_key: PublicKey,
    /// Absolute expiry. The grant is valid strictly before this instant.
    pub expires_at: Timestamp,
}

impl DelegationGrant {
    /// Build a grant lasting `duration_secs` from `now`.
    pub fn new(
        delegator: AccountAddress,
        delegate_public_key: PublicKey,
        duration_secs: u64,
        now: Timestamp,
    ) -> Result<Self, GrantError> {
        if duration_secs == 0 {
            return Err(GrantError::NonPositiveDuration);
        }
        let expires_at = now
            .checked_add_secs(duration_secs)
            .ok_or(GrantError::ExpiryOverflow { now, duration_secs })?;
        Ok(Self {
            delegator,
            delegate_public_key,
            expires_at,
        })
    }

    pub fn is_valid_at(&self, now: Timestamp) -> bool {
        now < self.expires_at
    }
}

/// Stored delegation state for one delegator.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DelegationState {
    #[default]
    NoGrant,
    Active(DelegationGrant),
    Revoked,
}

/// Observable phase of a [`DelegationState`] at a given instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GrantPhase {
    NoGrant,
    Active,
    Expired,
    Revoked,
}

impl DelegationState {
    /// Replace whatever is stored with a fresh grant.
    ///
    /// On error the state is left untouched.
    pub fn grant(
        &mut self,
        delegator: AccountAddress,
        delegate_public_key: PublicKey,
        duration_secs: u64,
        now: Timestamp,
    ) -> Result<(), GrantError> {
        let grant = DelegationGrant::new(delegator, delegate_public_key, duration_secs, now)?;
        *self = Self::Active(grant);
        Ok(())
    }

    pub fn revoke(&mut self) {
        *self = Self::Revoked;
    }

    pub fn is_valid_at(&self, now: Timestamp) -> bool {
        self.active_grant_at(now).is_some()
    }

    /// The stored grant, only if it is still valid at `now`.
    pub fn active_grant_at(&self, now: Timestamp) -> Option<&DelegationGrant> {
        match self {
            Self::Active(grant) if grant.is_valid_at(now) => Some(grant),
            _ => None,
        }
    }

    /// The stored grant regardless of expiry.
    pub fn stored_grant(&self) -> Option<&DelegationGrant> {
        match self {
            Self::Active(grant) => Some(grant),
            _ => None,
        }
    }

    pub fn phase_at(&self, now: Timestamp) -> GrantPhase {
        match self {
            Self::NoGrant => GrantPhase::NoGrant,
            Self::Revoked => GrantPhase::Revoked,
            Self::Active(grant) if grant.is_valid_at(now) => GrantPhase::Active,
            Self::Active(_) => GrantPhase::Expired,
        }
    }
}

impl fmt::Display for GrantPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NoGrant => "no-grant",
            Self::Active => "active",
            Self::Expired => "expired",
            Self::Revoked => "revoked",
        };
        f.write_str(s)
    }
}

/// Records that `owner`'s default signature check is replaced by `function`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticationBinding {
    pub owner: AccountAddress,
    pub function: FunctionRef,
}
