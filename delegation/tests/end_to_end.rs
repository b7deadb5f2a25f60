//! Full delegation lifecycle against the in-process ledger.

use std::sync::Arc;
use std::time::Duration;

use aegis_delegation::{DelegationController, DelegationError};
use aegis_ledger::{build_signed, submit_and_confirm, CommittedTransaction, LedgerClient, LedgerError, Payload, TransactionFactory};
use aegis_nullables::{NullClock, NullLedger, NullSigner};
use aegis_signer::{DigestSigner, LocalAccount, TransactionSigner};
use aegis_types::{AccountAddress, AuthError, DelegationState, FunctionRef, GrantPhase, NetworkId};

const START: u64 = 1_700_000_000;

struct World {
    clock: Arc<NullClock>,
    ledger: Arc<NullLedger>,
    controller: DelegationController,
    owner: Arc<LocalAccount>,
    delegate: Arc<NullSigner>,
}

impl World {
    fn new() -> Self {
        let clock = Arc::new(NullClock::new(START));
        let ledger = Arc::new(NullLedger::new(
            NetworkId::Local,
            AccountAddress::from_hex_literal("0xa11ce").unwrap(),
            clock.clone(),
        ));
        let factory = TransactionFactory::new(NetworkId::Local, clock.clone());
        let controller = DelegationController::in_memory(ledger.clone(), factory, Duration::from_secs(10));
        Self {
            clock,
            ledger,
            controller,
            owner: Arc::new(LocalAccount::generate()),
            delegate: Arc::new(NullSigner::generate()),
        }
    }

    fn routine(&self) -> FunctionRef {
        self.ledger.module().authenticate_fn().clone()
    }

    fn address(&self) -> AccountAddress {
        self.owner.address()
    }

    async fn enable(&self) -> Result<(), DelegationError> {
        self.controller
            .enable_abstraction(self.owner.clone(), self.routine())
            .await
            .map(|_| ())
    }

    async fn delegated_transfer(&self, amount: u64) -> Result<CommittedTransaction, LedgerError> {
        let signer = self
            .controller
            .abstracted_signer(&self.address(), self.delegate.clone())
            .expect("local state backs the signer");
        self.send_as(&signer, amount).await
    }

    async fn send_as(&self, signer: &dyn TransactionSigner, amount: u64) -> Result<CommittedTransaction, LedgerError> {
        let txn = build_signed(
            self.ledger.as_ref(),
            self.controller.factory(),
            signer,
            Payload::Transfer {
                to: self.address(),
                amount,
            },
        )
        .await?;
        submit_and_confirm(self.ledger.as_ref(), &txn, Duration::from_secs(10)).await
    }
}

#[tokio::test]
async fn delegated_transfer_accepted_then_expires() {
    let w = World::new();
    w.ledger.fund_account(&w.address(), 100_000_000).await.unwrap();

    w.enable().await.unwrap();
    let grant = w
        .controller
        .delegate(w.owner.clone(), w.delegate.public_key(), 600)
        .await
        .unwrap();
    assert_eq!(grant.expires_at.as_secs(), START + 600);

    let committed = w.delegated_transfer(1).await.unwrap();
    assert!(committed.is_success());
    assert_eq!(w.ledger.balance(&w.address()).await.unwrap(), 100_000_000);
    assert_eq!(w.delegate.signed().len(), 1);

    // Keep a signer obtained while the grant was live, then let it lapse.
    let stale = w
        .controller
        .abstracted_signer(&w.address(), w.delegate.clone())
        .unwrap();
    w.clock.advance(601);

    let err = w.send_as(&stale, 1).await.unwrap_err();
    assert_eq!(err.auth_rejection(), Some(&AuthError::NoActiveDelegation));

    assert_eq!(w.controller.grant_phase(&w.address()).unwrap(), GrantPhase::Expired);
    assert!(matches!(
        w.controller.abstracted_signer(&w.address(), w.delegate.clone()),
        Err(DelegationError::NoActiveDelegation(_))
    ));
}

#[tokio::test]
async fn delegate_before_enable_touches_nothing() {
    let w = World::new();

    let err = w
        .controller
        .delegate(w.owner.clone(), w.delegate.public_key(), 600)
        .await
        .unwrap_err();

    assert!(matches!(err, DelegationError::AbstractionNotEnabled(a) if a == w.address()));
    assert_eq!(w.ledger.submissions(), 0);
    assert_eq!(w.controller.grant_state(&w.address()).unwrap(), DelegationState::NoGrant);
    assert_eq!(w.ledger.delegation_state(&w.address()).unwrap(), DelegationState::NoGrant);
}

#[tokio::test]
async fn zero_duration_is_rejected_before_submission() {
    let w = World::new();
    w.enable().await.unwrap();
    let submitted = w.ledger.submissions();

    let err = w
        .controller
        .delegate(w.owner.clone(), w.delegate.public_key(), 0)
        .await
        .unwrap_err();

    assert!(matches!(err, DelegationError::Grant(_)));
    assert_eq!(w.ledger.submissions(), submitted);
    assert_eq!(w.controller.grant_state(&w.address()).unwrap(), DelegationState::NoGrant);
}

#[tokio::test]
async fn enable_is_idempotent_for_same_routine() {
    let w = World::new();
    w.enable().await.unwrap();
    assert_eq!(w.ledger.submissions(), 1);

    let binding = w
        .controller
        .enable_abstraction(w.owner.clone(), w.routine())
        .await
        .unwrap();
    assert_eq!(binding.function, w.routine());
    assert_eq!(w.ledger.submissions(), 1);

    let other: FunctionRef = "0xbeef::delegated_signer::authenticate".parse().unwrap();
    let err = w
        .controller
        .enable_abstraction(w.owner.clone(), other)
        .await
        .unwrap_err();
    assert!(matches!(err, DelegationError::AlreadyEnabled { existing, .. } if existing == w.routine()));
    assert_eq!(w.ledger.submissions(), 1);
}

#[tokio::test]
async fn new_grant_supersedes_old() {
    let w = World::new();
    w.ledger.fund_account(&w.address(), 10).await.unwrap();
    w.enable().await.unwrap();

    let first = Arc::new(NullSigner::generate());
    w.controller
        .delegate(w.owner.clone(), first.public_key(), 600)
        .await
        .unwrap();
    w.controller
        .delegate(w.owner.clone(), w.delegate.public_key(), 60)
        .await
        .unwrap();

    assert!(matches!(
        w.controller.abstracted_signer(&w.address(), first.clone()),
        Err(DelegationError::DelegateMismatch(_))
    ));

    // The ledger agrees: the first key is no longer accepted.
    let forged = aegis_signer::AbstractedSigner::new(w.address(), w.routine(), first);
    let err = w.send_as(&forged, 1).await.unwrap_err();
    assert_eq!(err.auth_rejection(), Some(&AuthError::DelegateMismatch));

    w.delegated_transfer(1).await.unwrap();
}

#[tokio::test]
async fn revoke_ends_delegation_and_repeats_are_noops() {
    let w = World::new();
    w.ledger.fund_account(&w.address(), 10).await.unwrap();

    // Nothing to revoke yet.
    assert_eq!(
        w.controller.revoke(w.owner.clone()).await.unwrap(),
        DelegationState::NoGrant
    );
    assert_eq!(w.ledger.submissions(), 0);

    w.enable().await.unwrap();
    w.controller
        .delegate(w.owner.clone(), w.delegate.public_key(), 600)
        .await
        .unwrap();
    let signer = w
        .controller
        .abstracted_signer(&w.address(), w.delegate.clone())
        .unwrap();

    assert_eq!(
        w.controller.revoke(w.owner.clone()).await.unwrap(),
        DelegationState::Revoked
    );
    assert_eq!(w.ledger.delegation_state(&w.address()).unwrap(), DelegationState::Revoked);

    let err = w.send_as(&signer, 1).await.unwrap_err();
    assert_eq!(err.auth_rejection(), Some(&AuthError::NoActiveDelegation));

    let submitted = w.ledger.submissions();
    w.controller.revoke(w.owner.clone()).await.unwrap();
    assert_eq!(w.ledger.submissions(), submitted);
}

#[tokio::test]
async fn other_sender_cannot_use_owners_grant() {
    let w = World::new();
    w.enable().await.unwrap();
    w.controller
        .delegate(w.owner.clone(), w.delegate.public_key(), 600)
        .await
        .unwrap();

    // A second owner who bound the routine but never delegated.
    let stranger = Arc::new(LocalAccount::generate());
    w.controller
        .enable_abstraction(stranger.clone(), w.routine())
        .await
        .unwrap();

    let forged = aegis_signer::AbstractedSigner::new(stranger.address(), w.routine(), w.delegate.clone());
    let txn = build_signed(
        w.ledger.as_ref(),
        w.controller.factory(),
        &forged,
        Payload::Transfer {
            to: stranger.address(),
            amount: 0,
        },
    )
    .await
    .unwrap();
    let err = submit_and_confirm(w.ledger.as_ref(), &txn, Duration::from_secs(10))
        .await
        .unwrap_err();
    assert_eq!(err.auth_rejection(), Some(&AuthError::NoActiveDelegation));
}

#[tokio::test(start_paused = true)]
async fn unconfirmed_delegation_leaves_local_state_alone() {
    let w = World::new();
    w.enable().await.unwrap();
    w.ledger.hang_confirmations(true);

    let err = w
        .controller
        .delegate(w.owner.clone(), w.delegate.public_key(), 600)
        .await
        .unwrap_err();

    assert!(matches!(
        err.ledger(),
        Some(LedgerError::ConfirmationTimeout { .. })
    ));
    assert_eq!(w.controller.grant_state(&w.address()).unwrap(), DelegationState::NoGrant);
}

#[tokio::test]
async fn signing_failure_submits_nothing() {
    let w = World::new();
    w.enable().await.unwrap();
    w.controller
        .delegate(w.owner.clone(), w.delegate.public_key(), 600)
        .await
        .unwrap();
    let submitted = w.ledger.submissions();

    w.delegate.fail_signing(true);
    let signer = w
        .controller
        .abstracted_signer(&w.address(), w.delegate.clone())
        .unwrap();
    let err = w.send_as(&signer, 1).await.unwrap_err();

    assert!(matches!(err, LedgerError::Signer(_)));
    assert_eq!(w.ledger.submissions(), submitted);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_grants_for_one_owner_agree_with_ledger() {
    let w = World::new();
    w.enable().await.unwrap();

    let keys: Vec<_> = (0..8).map(|_| NullSigner::generate().public_key()).collect();
    let mut tasks = Vec::new();
    for key in keys.clone() {
        let controller = w.controller.clone();
        let owner = w.owner.clone();
        tasks.push(tokio::spawn(async move {
            controller.delegate(owner, key, 600).await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let local = w.controller.grant_state(&w.address()).unwrap();
    let on_ledger = w.ledger.delegation_state(&w.address()).unwrap();
    let local_key = local.stored_grant().unwrap().delegate_public_key;
    assert_eq!(local_key, on_ledger.stored_grant().unwrap().delegate_public_key);
    assert!(keys.contains(&local_key));
    // One enable plus one submission per grant, each at its own sequence number.
    assert_eq!(w.ledger.sequence_number(&w.address()).await.unwrap(), 9);
}
