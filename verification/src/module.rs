//! The `delegated_signer` on-ledger module.

use std::sync::Arc;

use aegis_store::DelegationStore;
use aegis_types::{AccountAddress, DelegationState, FunctionRef, ParseError, PublicKey, Timestamp};

use crate::error::VerificationError;
use crate::routine;

pub const MODULE_NAME: &str = "delegated_signer";
pub const AUTHENTICATE_FN: &str = "authenticate";
pub const DELEGATE_FN: &str = "delegate_for_seconds";
pub const REVOKE_FN: &str = "revoke";

/// A published copy of the `delegated_signer` module and the delegation
/// state it owns.
///
/// Entry points mutate state with compare-and-swap, so concurrent grants for
/// the same delegator serialize: the last committed grant wins.
#[derive(Clone)]
pub struct DelegatedSignerModule {
    publisher: AccountAddress,
    authenticate_fn: FunctionRef,
    delegate_fn: FunctionRef,
    revoke_fn: FunctionRef,
    store: Arc<dyn DelegationStore>,
}

impl DelegatedSignerModule {
    pub fn new(publisher: AccountAddress, store: Arc<dyn DelegationStore>) -> Self {
        Self {
            publisher,
            authenticate_fn: function(publisher, AUTHENTICATE_FN),
            delegate_fn: function(publisher, DELEGATE_FN),
            revoke_fn: function(publisher, REVOKE_FN),
            store,
        }
    }

    /// Reference to the module's authentication routine under `publisher`.
    pub fn authenticate_ref(publisher: AccountAddress) -> FunctionRef {
        function(publisher, AUTHENTICATE_FN)
    }

    /// Resolve the module from its authentication routine reference.
    pub fn publisher_of(routine: &FunctionRef) -> Result<AccountAddress, ParseError> {
        if routine.module() != MODULE_NAME || routine.function() != AUTHENTICATE_FN {
            return Err(ParseError::Function(format!(
                "{routine} is not {MODULE_NAME}::{AUTHENTICATE_FN}"
            )));
        }
        Ok(*routine.address())
    }

    pub fn publisher(&self) -> &AccountAddress {
        &self.publisher
    }

    pub fn authenticate_fn(&self) -> &FunctionRef {
        &self.authenticate_fn
    }

    pub fn delegate_fn(&self) -> &FunctionRef {
        &self.delegate_fn
    }

    pub fn revoke_fn(&self) -> &FunctionRef {
        &self.revoke_fn
    }

    pub fn store(&self) -> &Arc<dyn DelegationStore> {
        &self.store
    }

    /// Run the authentication routine for `sender`.
    pub fn authenticate(
        &self,
        sender: &AccountAddress,
        digest: &[u8],
        envelope_bytes: &[u8],
        now: Timestamp,
    ) -> Result<(), VerificationError> {
        routine::authenticate(self.store.as_ref(), sender, digest, envelope_bytes, now)
    }

    /// `delegate_for_seconds` entry point: grant `delegate_public_key` the
    /// right to sign for `delegator` for `seconds` from `now`.
    pub fn delegate_for_seconds(
        &self,
        delegator: &AccountAddress,
        delegate_public_key: PublicKey,
        seconds: u64,
        now: Timestamp,
    ) -> Result<DelegationState, VerificationError> {
        self.update(delegator, |state| {
            state.grant(*delegator, delegate_public_key, seconds, now)
        })
    }

    /// `revoke` entry point.
    pub fn revoke(&self, delegator: &AccountAddress) -> Result<DelegationState, VerificationError> {
        self.update(delegator, |state| {
            state.revoke();
            Ok(())
        })
    }

    fn update<F>(&self, delegator: &AccountAddress, mut apply: F) -> Result<DelegationState, VerificationError>
    where
        F: FnMut(&mut DelegationState) -> Result<(), aegis_types::GrantError>,
    {
        loop {
            let current = self.store.get_delegation(delegator)?;
            let mut next = current.clone();
            apply(&mut next)?;
            if self
                .store
                .compare_and_swap_delegation(delegator, &current, next.clone())?
            {
                return Ok(next);
            }
            tracing::trace!(%delegator, "delegation changed underneath update, retrying");
        }
    }
}

fn function(publisher: AccountAddress, name: &str) -> FunctionRef {
    // Module and function names are compile-time identifiers.
    FunctionRef::new(publisher, MODULE_NAME, name).expect("static identifiers are valid")
}

#[cfg(test)]
mod tests {
    use super::*;
    use aegis_store::MemoryStore;
    use aegis_types::{AuthError, GrantError, GrantPhase};

    fn module() -> DelegatedSignerModule {
        DelegatedSignerModule::new(
            AccountAddress::from_hex_literal("0xcafe").unwrap(),
            Arc::new(MemoryStore::new()),
        )
    }

    #[test]
    fn function_refs_live_under_publisher() {
        let m = module();
        assert_eq!(
            m.authenticate_fn().to_string(),
            format!("{}::delegated_signer::authenticate", m.publisher())
        );
        assert_eq!(m.delegate_fn().function(), "delegate_for_seconds");
        assert_eq!(m.revoke_fn().function(), "revoke");
        assert_eq!(
            DelegatedSignerModule::authenticate_ref(*m.publisher()),
            *m.authenticate_fn()
        );
    }

    #[test]
    fn publisher_of_requires_authenticate_routine() {
        let m = module();
        assert_eq!(
            DelegatedSignerModule::publisher_of(m.authenticate_fn()).unwrap(),
            *m.publisher()
        );
        assert!(DelegatedSignerModule::publisher_of(m.revoke_fn()).is_err());
    }

    #[test]
    fn delegate_then_revoke() {
        let m = module();
        let owner = AccountAddress::new([1u8; 32]);
        let key = PublicKey([2u8; 32]);

        let state = m
            .delegate_for_seconds(&owner, key, 60, Timestamp::new(100))
            .unwrap();
        assert_eq!(state.phase_at(Timestamp::new(159)), GrantPhase::Active);
        assert_eq!(m.store().get_delegation(&owner).unwrap(), state);

        let state = m.revoke(&owner).unwrap();
        assert_eq!(state, DelegationState::Revoked);
    }

    #[test]
    fn zero_seconds_is_rejected_and_state_kept() {
        let m = module();
        let owner = AccountAddress::new([1u8; 32]);
        let err = m
            .delegate_for_seconds(&owner, PublicKey([2u8; 32]), 0, Timestamp::new(100))
            .unwrap_err();
        assert!(matches!(err, VerificationError::Grant(GrantError::NonPositiveDuration)));
        assert_eq!(m.store().get_delegation(&owner).unwrap(), DelegationState::NoGrant);
    }

    #[test]
    fn authenticate_reads_module_store() {
        let m = module();
        let err = m
            .authenticate(&AccountAddress::ZERO, &[0u8; 32], &[0u8; 98], Timestamp::new(0))
            .unwrap_err();
        // A zeroed buffer fails the length prefix before the grant lookup.
        assert!(matches!(err.rejection(), Some(AuthError::MalformedEnvelope(_))));
    }
}
