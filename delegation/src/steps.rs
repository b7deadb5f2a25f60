//! Controller operations as orchestrator steps.
//!
//! Every step takes the owner's lock in `build` and holds it until the
//! transaction has committed and local state is updated (`finalize`), so a
//! step in a sequence cannot interleave with another operation on the same
//! owner. The lock is also released when the step is skipped, aborted after
//! a failed submit or confirmation, or dropped.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::OwnedMutexGuard;

use aegis_ledger::{build_signed, CommittedTransaction, LedgerClient, Payload};
use aegis_orchestrator::{Prepared, Step};
use aegis_signer::{DigestSigner, TransactionSigner};
use aegis_store::BindOutcome;
use aegis_types::{
    AccountAddress, AuthenticationBinding, DelegationGrant, DelegationState, FunctionRef,
    PublicKey, Timestamp,
};
use aegis_verification::module::{DELEGATE_FN, REVOKE_FN};

use crate::controller::DelegationController;
use crate::error::DelegationError;

/// Owner lock held across a step's phases.
#[derive(Default)]
struct OwnerGuard(Mutex<Option<OwnedMutexGuard<()>>>);

impl OwnerGuard {
    async fn acquire(&self, controller: &DelegationController, owner: &AccountAddress) -> Result<(), DelegationError> {
        // A rebuilt step must not wait on its own earlier guard.
        self.release();
        let guard = controller.lock_owner(owner).await?;
        if let Ok(mut slot) = self.0.lock() {
            *slot = Some(guard);
        }
        Ok(())
    }

    fn release(&self) {
        if let Ok(mut slot) = self.0.lock() {
            slot.take();
        }
    }
}

fn required_binding(
    controller: &DelegationController,
    owner: &AccountAddress,
) -> Result<AuthenticationBinding, DelegationError> {
    controller
        .binding(owner)?
        .ok_or(DelegationError::AbstractionNotEnabled(*owner))
}

/// Apply `apply` to the owner's local state with compare-and-swap.
fn update_state<F>(
    controller: &DelegationController,
    owner: &AccountAddress,
    mut apply: F,
) -> Result<DelegationState, DelegationError>
where
    F: FnMut(&mut DelegationState) -> Result<(), DelegationError>,
{
    let store = controller.delegations();
    loop {
        let current = store.get_delegation(owner)?;
        let mut next = current.clone();
        apply(&mut next)?;
        if store.compare_and_swap_delegation(owner, &current, next.clone())? {
            return Ok(next);
        }
    }
}

/// Bind the owner's account to an authentication routine.
pub struct EnableStep {
    controller: DelegationController,
    owner: Arc<dyn TransactionSigner>,
    function: FunctionRef,
    guard: OwnerGuard,
}

impl EnableStep {
    pub(crate) fn new(controller: DelegationController, owner: Arc<dyn TransactionSigner>, function: FunctionRef) -> Self {
        Self {
            controller,
            owner,
            function,
            guard: OwnerGuard::default(),
        }
    }

    async fn prepare(&self, ledger: &dyn LedgerClient, owner: AccountAddress) -> Result<Prepared, DelegationError> {
        if let Some(existing) = self.controller.binding(&owner)? {
            if existing.function == self.function {
                tracing::debug!(%owner, function = %self.function, "abstraction already enabled");
                return Ok(Prepared::Skip);
            }
            return Err(DelegationError::AlreadyEnabled {
                owner,
                existing: existing.function,
            });
        }

        let payload = Payload::EnableAbstraction {
            function: self.function.clone(),
        };
        let txn = build_signed(ledger, self.controller.factory(), self.owner.as_ref(), payload).await?;
        Ok(Prepared::Submit(txn))
    }
}

#[async_trait]
impl Step for EnableStep {
    type Error = DelegationError;

    fn abort(&self) {
        self.guard.release();
    }

    fn label(&self) -> String {
        format!("enable_abstraction({})", self.owner.address())
    }

    async fn build(&self, ledger: &dyn LedgerClient) -> Result<Prepared, DelegationError> {
        let owner = self.owner.address();
        self.guard.acquire(&self.controller, &owner).await?;
        let prepared = self.prepare(ledger, owner).await;
        if !matches!(prepared, Ok(Prepared::Submit(_))) {
            self.guard.release();
        }
        prepared
    }

    async fn finalize(&self, _committed: &CommittedTransaction) -> Result<(), DelegationError> {
        let owner = self.owner.address();
        let binding = AuthenticationBinding {
            owner,
            function: self.function.clone(),
        };
        let outcome = self.controller.bindings().bind_if_absent(&binding);
        self.guard.release();
        match outcome? {
            BindOutcome::Bound => {
                tracing::info!(%owner, function = %self.function, "abstraction enabled");
                Ok(())
            }
            BindOutcome::Existing(existing) if existing.function == self.function => Ok(()),
            BindOutcome::Existing(existing) => Err(DelegationError::AlreadyEnabled {
                owner,
                existing: existing.function,
            }),
        }
    }
}

/// Grant a delegate key for a number of seconds.
pub struct DelegateStep {
    controller: DelegationController,
    owner: Arc<dyn TransactionSigner>,
    delegate_public_key: PublicKey,
    duration_secs: u64,
    built_at: Mutex<Option<Timestamp>>,
    guard: OwnerGuard,
}

impl DelegateStep {
    pub(crate) fn new(
        controller: DelegationController,
        owner: Arc<dyn TransactionSigner>,
        delegate_public_key: PublicKey,
        duration_secs: u64,
    ) -> Self {
        Self {
            controller,
            owner,
            delegate_public_key,
            duration_secs,
            built_at: Mutex::new(None),
            guard: OwnerGuard::default(),
        }
    }

    async fn prepare(&self, ledger: &dyn LedgerClient, owner: AccountAddress) -> Result<Prepared, DelegationError> {
        let binding = required_binding(&self.controller, &owner)?;
        let now = self.controller.clock().now();
        // Validate locally so nothing invalid reaches the ledger.
        DelegationGrant::new(owner, self.delegate_public_key, self.duration_secs, now)?;

        let payload = Payload::DelegateForSeconds {
            entry: binding.function.sibling(DELEGATE_FN)?,
            delegate_public_key: self.delegate_public_key,
            seconds: self.duration_secs,
        };
        let txn = build_signed(ledger, self.controller.factory(), self.owner.as_ref(), payload).await?;
        if let Ok(mut built_at) = self.built_at.lock() {
            *built_at = Some(now);
        }
        Ok(Prepared::Submit(txn))
    }
}

#[async_trait]
impl Step for DelegateStep {
    type Error = DelegationError;

    fn abort(&self) {
        self.guard.release();
    }

    fn label(&self) -> String {
        format!("delegate({}, {}s)", self.owner.address(), self.duration_secs)
    }

    async fn build(&self, ledger: &dyn LedgerClient) -> Result<Prepared, DelegationError> {
        let owner = self.owner.address();
        self.guard.acquire(&self.controller, &owner).await?;
        let prepared = self.prepare(ledger, owner).await;
        if prepared.is_err() {
            self.guard.release();
        }
        prepared
    }

    async fn finalize(&self, _committed: &CommittedTransaction) -> Result<(), DelegationError> {
        let owner = self.owner.address();
        // The ledger started the grant no earlier than the build time, so the
        // local copy never outlives the on-ledger one.
        let start = self
            .built_at
            .lock()
            .ok()
            .and_then(|t| *t)
            .unwrap_or_else(|| self.controller.clock().now());
        let result = update_state(&self.controller, &owner, |state| {
            Ok(state.grant(owner, self.delegate_public_key, self.duration_secs, start)?)
        });
        self.guard.release();

        if let DelegationState::Active(grant) = result? {
            tracing::info!(
                %owner,
                delegate = %self.delegate_public_key,
                expires_at = %grant.expires_at,
                "delegation granted"
            );
        }
        Ok(())
    }
}

/// End the owner's delegation, if there is one.
pub struct RevokeStep {
    controller: DelegationController,
    owner: Arc<dyn TransactionSigner>,
    guard: OwnerGuard,
}

impl RevokeStep {
    pub(crate) fn new(controller: DelegationController, owner: Arc<dyn TransactionSigner>) -> Self {
        Self {
            controller,
            owner,
            guard: OwnerGuard::default(),
        }
    }

    async fn prepare(&self, ledger: &dyn LedgerClient, owner: AccountAddress) -> Result<Prepared, DelegationError> {
        match self.controller.grant_state(&owner)? {
            DelegationState::NoGrant | DelegationState::Revoked => {
                tracing::debug!(%owner, "nothing to revoke");
                return Ok(Prepared::Skip);
            }
            DelegationState::Active(_) => {}
        }
        let binding = required_binding(&self.controller, &owner)?;
        let payload = Payload::RevokeDelegation {
            entry: binding.function.sibling(REVOKE_FN)?,
        };
        let txn = build_signed(ledger, self.controller.factory(), self.owner.as_ref(), payload).await?;
        Ok(Prepared::Submit(txn))
    }
}

#[async_trait]
impl Step for RevokeStep {
    type Error = DelegationError;

    fn abort(&self) {
        self.guard.release();
    }

    fn label(&self) -> String {
        format!("revoke({})", self.owner.address())
    }

    async fn build(&self, ledger: &dyn LedgerClient) -> Result<Prepared, DelegationError> {
        let owner = self.owner.address();
        self.guard.acquire(&self.controller, &owner).await?;
        let prepared = self.prepare(ledger, owner).await;
        if !matches!(prepared, Ok(Prepared::Submit(_))) {
            self.guard.release();
        }
        prepared
    }

    async fn finalize(&self, _committed: &CommittedTransaction) -> Result<(), DelegationError> {
        let owner = self.owner.address();
        let result = update_state(&self.controller, &owner, |state| {
            state.revoke();
            Ok(())
        });
        self.guard.release();
        result?;
        tracing::info!(%owner, "delegation revoked");
        Ok(())
    }
}

/// Sign a payload as the owner with a delegate key.
///
/// The abstracted signer is resolved at build time, so the step fails fast
/// if the grant behind it is missing, expired or for another key.
pub struct DelegatedTransactionStep {
    controller: DelegationController,
    owner: AccountAddress,
    delegate: Arc<dyn DigestSigner>,
    payload: Payload,
    guard: OwnerGuard,
}

impl DelegatedTransactionStep {
    pub(crate) fn new(
        controller: DelegationController,
        owner: AccountAddress,
        delegate: Arc<dyn DigestSigner>,
        payload: Payload,
    ) -> Self {
        Self {
            controller,
            owner,
            delegate,
            payload,
            guard: OwnerGuard::default(),
        }
    }

    async fn prepare(&self, ledger: &dyn LedgerClient) -> Result<Prepared, DelegationError> {
        let signer = self
            .controller
            .abstracted_signer(&self.owner, self.delegate.clone())?;
        let txn = build_signed(ledger, self.controller.factory(), &signer, self.payload.clone()).await?;
        Ok(Prepared::Submit(txn))
    }
}

#[async_trait]
impl Step for DelegatedTransactionStep {
    type Error = DelegationError;

    fn abort(&self) {
        self.guard.release();
    }

    fn label(&self) -> String {
        format!("delegated {}({})", self.payload.kind(), self.owner)
    }

    async fn build(&self, ledger: &dyn LedgerClient) -> Result<Prepared, DelegationError> {
        self.guard.acquire(&self.controller, &self.owner).await?;
        let prepared = self.prepare(ledger).await;
        if prepared.is_err() {
            self.guard.release();
        }
        prepared
    }

    async fn finalize(&self, _committed: &CommittedTransaction) -> Result<(), DelegationError> {
        self.guard.release();
        Ok(())
    }
}
