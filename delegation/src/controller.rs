//! The delegation controller.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::OwnedMutexGuard;

use aegis_ledger::{LedgerClient, TransactionFactory};
use aegis_orchestrator::TransactionOrchestrator;
use aegis_signer::{AbstractedSigner, DigestSigner, TransactionSigner};
use aegis_store::{BindingStore, DelegationStore, MemoryStore, StoreError};
use aegis_types::{
    AccountAddress, AuthenticationBinding, Clock, DelegationGrant, DelegationState, FunctionRef,
    GrantPhase, PublicKey,
};

use crate::error::DelegationError;
use crate::steps::{DelegateStep, DelegatedTransactionStep, EnableStep, RevokeStep};

type OwnerLocks = Mutex<HashMap<AccountAddress, Arc<tokio::sync::Mutex<()>>>>;

/// Drives enable / delegate / revoke for any number of owners.
///
/// Operations on the same owner are serialized for their whole
/// build → submit → confirm cycle; operations on different owners run
/// independently. Local state only changes after the ledger commits.
///
/// Cheap to clone; clones share stores and locks.
#[derive(Clone)]
pub struct DelegationController {
    inner: Arc<Inner>,
}

struct Inner {
    orchestrator: TransactionOrchestrator,
    factory: TransactionFactory,
    delegations: Arc<dyn DelegationStore>,
    bindings: Arc<dyn BindingStore>,
    locks: OwnerLocks,
}

impl DelegationController {
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        factory: TransactionFactory,
        delegations: Arc<dyn DelegationStore>,
        bindings: Arc<dyn BindingStore>,
        confirmation_timeout: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                orchestrator: TransactionOrchestrator::new(ledger, confirmation_timeout),
                factory,
                delegations,
                bindings,
                locks: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Controller keeping its local state in a fresh [`MemoryStore`].
    pub fn in_memory(
        ledger: Arc<dyn LedgerClient>,
        factory: TransactionFactory,
        confirmation_timeout: Duration,
    ) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self::new(ledger, factory, store.clone(), store, confirmation_timeout)
    }

    pub fn orchestrator(&self) -> &TransactionOrchestrator {
        &self.inner.orchestrator
    }

    pub fn factory(&self) -> &TransactionFactory {
        &self.inner.factory
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        self.inner.factory.clock()
    }

    pub(crate) fn delegations(&self) -> &dyn DelegationStore {
        self.inner.delegations.as_ref()
    }

    pub(crate) fn bindings(&self) -> &dyn BindingStore {
        self.inner.bindings.as_ref()
    }

    /// Bind `owner`'s account to `function`.
    ///
    /// Repeating the call with the same function returns the existing
    /// binding without touching the ledger. A different function fails with
    /// [`DelegationError::AlreadyEnabled`].
    pub async fn enable_abstraction(
        &self,
        owner: Arc<dyn TransactionSigner>,
        function: FunctionRef,
    ) -> Result<AuthenticationBinding, DelegationError> {
        let address = owner.address();
        self.orchestrator()
            .run_step::<DelegationError>(&self.enable_step(owner, function))
            .await?;
        self.binding(&address)?
            .ok_or(DelegationError::AbstractionNotEnabled(address))
    }

    /// Grant `delegate_public_key` the right to sign for `owner` for
    /// `duration_secs` seconds, superseding any earlier grant.
    pub async fn delegate(
        &self,
        owner: Arc<dyn TransactionSigner>,
        delegate_public_key: PublicKey,
        duration_secs: u64,
    ) -> Result<DelegationGrant, DelegationError> {
        let address = owner.address();
        self.orchestrator()
            .run_step::<DelegationError>(&self.delegate_step(owner, delegate_public_key, duration_secs))
            .await?;
        match self.grant_state(&address)? {
            DelegationState::Active(grant) => Ok(grant),
            _ => Err(DelegationError::NoActiveDelegation(address)),
        }
    }

    /// End `owner`'s delegation. A no-op if there is nothing to revoke.
    pub async fn revoke(&self, owner: Arc<dyn TransactionSigner>) -> Result<DelegationState, DelegationError> {
        let address = owner.address();
        self.orchestrator()
            .run_step::<DelegationError>(&self.revoke_step(owner))
            .await?;
        self.grant_state(&address)
    }

    /// A signer that authorizes transactions from `owner` with `delegate`.
    ///
    /// Fails fast when the local state cannot back it: no binding, no grant
    /// valid right now, or a grant for a different key.
    pub fn abstracted_signer(
        &self,
        owner: &AccountAddress,
        delegate: Arc<dyn DigestSigner>,
    ) -> Result<AbstractedSigner, DelegationError> {
        let binding = self
            .binding(owner)?
            .ok_or(DelegationError::AbstractionNotEnabled(*owner))?;
        let state = self.grant_state(owner)?;
        let grant = state
            .active_grant_at(self.clock().now())
            .ok_or(DelegationError::NoActiveDelegation(*owner))?;
        if grant.delegate_public_key != delegate.public_key() {
            return Err(DelegationError::DelegateMismatch(*owner));
        }
        Ok(AbstractedSigner::new(*owner, binding.function, delegate))
    }

    /// Locally mirrored grant state. Never mutates.
    pub fn grant_state(&self, owner: &AccountAddress) -> Result<DelegationState, DelegationError> {
        Ok(self.delegations().get_delegation(owner)?)
    }

    /// [`grant_state`](Self::grant_state) evaluated at the current time.
    pub fn grant_phase(&self, owner: &AccountAddress) -> Result<GrantPhase, DelegationError> {
        Ok(self.grant_state(owner)?.phase_at(self.clock().now()))
    }

    pub fn binding(&self, owner: &AccountAddress) -> Result<Option<AuthenticationBinding>, DelegationError> {
        Ok(self.bindings().get_binding(owner)?)
    }

    pub fn enable_step(&self, owner: Arc<dyn TransactionSigner>, function: FunctionRef) -> EnableStep {
        EnableStep::new(self.clone(), owner, function)
    }

    pub fn delegate_step(
        &self,
        owner: Arc<dyn TransactionSigner>,
        delegate_public_key: PublicKey,
        duration_secs: u64,
    ) -> DelegateStep {
        DelegateStep::new(self.clone(), owner, delegate_public_key, duration_secs)
    }

    pub fn revoke_step(&self, owner: Arc<dyn TransactionSigner>) -> RevokeStep {
        RevokeStep::new(self.clone(), owner)
    }

    /// A step that signs `payload` as `owner` with `delegate`, resolving the
    /// abstracted signer only when the step is built.
    pub fn delegated_step(
        &self,
        owner: AccountAddress,
        delegate: Arc<dyn DigestSigner>,
        payload: aegis_ledger::Payload,
    ) -> DelegatedTransactionStep {
        DelegatedTransactionStep::new(self.clone(), owner, delegate, payload)
    }

    /// Wait for exclusive access to `owner`.
    pub(crate) async fn lock_owner(&self, owner: &AccountAddress) -> Result<OwnedMutexGuard<()>, DelegationError> {
        let lock = {
            let mut locks = self
                .inner
                .locks
                .lock()
                .map_err(|_| StoreError::Backend("owner lock table poisoned".into()))?;
            locks.entry(*owner).or_default().clone()
        };
        Ok(lock.lock_owned().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aegis_ledger::{
        CommittedTransaction, LedgerError, PendingTransaction, SignedTransaction,
    };
    use aegis_signer::KeySigner;
    use aegis_types::{NetworkId, SystemClock, Timestamp};
    use async_trait::async_trait;

    /// A ledger that must never be reached.
    struct Unreachable;

    #[async_trait]
    impl LedgerClient for Unreachable {
        async fn sequence_number(&self, _account: &AccountAddress) -> Result<u64, LedgerError> {
            panic!("ledger contacted")
        }
        async fn balance(&self, _account: &AccountAddress) -> Result<u64, LedgerError> {
            panic!("ledger contacted")
        }
        async fn submit(&self, _txn: &SignedTransaction) -> Result<PendingTransaction, LedgerError> {
            panic!("ledger contacted")
        }
        async fn wait_for_transaction(
            &self,
            _pending: &PendingTransaction,
        ) -> Result<CommittedTransaction, LedgerError> {
            panic!("ledger contacted")
        }
        async fn fund_account(&self, _account: &AccountAddress, _amount: u64) -> Result<(), LedgerError> {
            panic!("ledger contacted")
        }
    }

    fn controller() -> DelegationController {
        DelegationController::in_memory(
            Arc::new(Unreachable),
            TransactionFactory::new(NetworkId::Local, Arc::new(SystemClock)),
            Duration::from_secs(5),
        )
    }

    fn routine() -> FunctionRef {
        "0x1::delegated_signer::authenticate".parse().unwrap()
    }

    #[test]
    fn signer_requires_binding() {
        let c = controller();
        let owner = AccountAddress::new([1u8; 32]);
        assert!(matches!(
            c.abstracted_signer(&owner, Arc::new(KeySigner::generate())),
            Err(DelegationError::AbstractionNotEnabled(_))
        ));
    }

    #[test]
    fn signer_requires_live_grant_for_same_key() {
        let c = controller();
        let owner = AccountAddress::new([1u8; 32]);
        c.bindings()
            .bind_if_absent(&AuthenticationBinding {
                owner,
                function: routine(),
            })
            .unwrap();
        let delegate = Arc::new(KeySigner::generate());

        assert!(matches!(
            c.abstracted_signer(&owner, delegate.clone()),
            Err(DelegationError::NoActiveDelegation(_))
        ));

        let now = c.clock().now();
        let mut state = DelegationState::default();
        state.grant(owner, delegate.public_key(), 3_600, now).unwrap();
        c.delegations().put_delegation(&owner, state).unwrap();

        let signer = c.abstracted_signer(&owner, delegate.clone()).unwrap();
        assert_eq!(signer.owner(), &owner);
        assert_eq!(signer.function(), &routine());

        assert!(matches!(
            c.abstracted_signer(&owner, Arc::new(KeySigner::generate())),
            Err(DelegationError::DelegateMismatch(_))
        ));
    }

    #[test]
    fn expired_grant_cannot_back_signer() {
        let c = controller();
        let owner = AccountAddress::new([1u8; 32]);
        c.bindings()
            .bind_if_absent(&AuthenticationBinding {
                owner,
                function: routine(),
            })
            .unwrap();
        let delegate = Arc::new(KeySigner::generate());
        let mut state = DelegationState::default();
        state.grant(owner, delegate.public_key(), 1, Timestamp::new(10)).unwrap();
        c.delegations().put_delegation(&owner, state).unwrap();

        assert_eq!(c.grant_phase(&owner).unwrap(), GrantPhase::Expired);
        assert!(matches!(
            c.abstracted_signer(&owner, delegate),
            Err(DelegationError::NoActiveDelegation(_))
        ));
    }

    #[tokio::test]
    async fn owner_lock_is_exclusive_per_owner() {
        let c = controller();
        let a = AccountAddress::new([1u8; 32]);
        let b = AccountAddress::new([2u8; 32]);

        let guard = c.lock_owner(&a).await.unwrap();
        // Another owner is not blocked.
        let _other = c.lock_owner(&b).await.unwrap();
        // The same owner is.
        let waiting = tokio::time::timeout(Duration::from_millis(20), c.lock_owner(&a)).await;
        assert!(waiting.is_err());

        drop(guard);
        assert!(c.lock_owner(&a).await.is_ok());
    }

    #[tokio::test]
    async fn zero_duration_fails_before_ledger() {
        let c = controller();
        let owner: Arc<dyn TransactionSigner> = Arc::new(aegis_signer::LocalAccount::generate());
        c.bindings()
            .bind_if_absent(&AuthenticationBinding {
                owner: owner.address(),
                function: routine(),
            })
            .unwrap();

        let err = c.delegate(owner.clone(), PublicKey([5u8; 32]), 0).await.unwrap_err();
        assert!(matches!(err, DelegationError::Grant(_)));
        assert_eq!(c.grant_state(&owner.address()).unwrap(), DelegationState::NoGrant);
    }
}
