//! Nullable ledger: an in-process ledger with the `delegated_signer`
//! module published at a fixed address.
//!
//! Submission runs the prologue (network, expiry, authenticator, sequence
//! number) and rejects synchronously. Accepted transactions execute
//! immediately in submission order; `wait_for_transaction` then reports the
//! commit after the configured confirmation delay.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use aegis_crypto::{derive_address, verify_signature};
use aegis_ledger::{
    CommittedTransaction, ExecutionStatus, LedgerClient, LedgerError, Payload, PendingTransaction,
    RejectionReason, SignedTransaction,
};
use aegis_signer::TransactionAuthenticator;
use aegis_store::{BindOutcome, BindingStore, DelegationStore, MemoryStore};
use aegis_types::{
    AccountAddress, AuthError, AuthenticationBinding, Clock, DelegationState, NetworkId, TxHash,
};
use aegis_verification::{DelegatedSignerModule, VerificationError};

#[derive(Clone, Debug, Default)]
struct Account {
    sequence_number: u64,
    balance: u64,
}

#[derive(Default)]
struct LedgerState {
    accounts: HashMap<AccountAddress, Account>,
    committed: HashMap<TxHash, CommittedTransaction>,
    next_version: u64,
}

pub struct NullLedger {
    network: NetworkId,
    clock: Arc<dyn Clock>,
    module: DelegatedSignerModule,
    bindings: Arc<MemoryStore>,
    state: Mutex<LedgerState>,
    confirmation_delay: Mutex<Duration>,
    hang_confirmations: AtomicBool,
    fail_next_submit: Mutex<Option<String>>,
    submissions: AtomicUsize,
}

impl NullLedger {
    /// A ledger for `network` with `delegated_signer` published by `publisher`.
    pub fn new(network: NetworkId, publisher: AccountAddress, clock: Arc<dyn Clock>) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            network,
            clock,
            module: DelegatedSignerModule::new(publisher, store.clone()),
            bindings: store,
            state: Mutex::new(LedgerState::default()),
            confirmation_delay: Mutex::new(Duration::ZERO),
            hang_confirmations: AtomicBool::new(false),
            fail_next_submit: Mutex::new(None),
            submissions: AtomicUsize::new(0),
        }
    }

    pub fn network(&self) -> NetworkId {
        self.network
    }

    pub fn module(&self) -> &DelegatedSignerModule {
        &self.module
    }

    /// Simulated time between commit and the ledger reporting it.
    pub fn set_confirmation_delay(&self, delay: Duration) {
        if let Ok(mut d) = self.confirmation_delay.lock() {
            *d = delay;
        }
    }

    /// While set, `wait_for_transaction` never returns.
    pub fn hang_confirmations(&self, hang: bool) {
        self.hang_confirmations.store(hang, Ordering::SeqCst);
    }

    /// Make the next `submit` fail with a transport error, before any checks.
    pub fn fail_next_submit(&self, message: impl Into<String>) {
        if let Ok(mut f) = self.fail_next_submit.lock() {
            *f = Some(message.into());
        }
    }

    /// Number of `submit` calls received, including rejected and duplicate ones.
    pub fn submissions(&self) -> usize {
        self.submissions.load(Ordering::SeqCst)
    }

    /// Number of distinct committed transactions.
    pub fn committed_count(&self) -> usize {
        self.lock().map(|s| s.committed.len()).unwrap_or(0)
    }

    /// On-ledger delegation state for `delegator`.
    pub fn delegation_state(&self, delegator: &AccountAddress) -> Result<DelegationState, LedgerError> {
        self.module
            .store()
            .get_delegation(delegator)
            .map_err(|e| LedgerError::Transport(e.to_string()))
    }

    /// On-ledger authentication binding for `owner`.
    pub fn binding(&self, owner: &AccountAddress) -> Result<Option<AuthenticationBinding>, LedgerError> {
        self.bindings
            .get_binding(owner)
            .map_err(|e| LedgerError::Transport(e.to_string()))
    }

    fn lock(&self) -> Result<MutexGuard<'_, LedgerState>, LedgerError> {
        self.state
            .lock()
            .map_err(|_| LedgerError::Transport("ledger state poisoned".into()))
    }

    /// Checks that reject a transaction before it is sequenced.
    fn prologue(
        &self,
        txn: &SignedTransaction,
        digest: &[u8],
        account: &Account,
    ) -> Result<(), RejectionReason> {
        let raw = &txn.raw;
        if raw.network != self.network {
            return Err(RejectionReason::WrongNetwork {
                expected: self.network,
                got: raw.network,
            });
        }
        let now = self.clock.now();
        if now >= raw.expiration {
            return Err(RejectionReason::Expired(raw.expiration));
        }

        match &txn.authenticator {
            TransactionAuthenticator::Ed25519 {
                public_key,
                signature,
            } => {
                if derive_address(public_key) != raw.sender || !verify_signature(digest, signature, public_key) {
                    return Err(RejectionReason::InvalidSignature);
                }
            }
            TransactionAuthenticator::Abstraction { function, envelope } => {
                let bound = self
                    .bindings
                    .get_binding(&raw.sender)
                    .map_err(|e| RejectionReason::Aborted(e.to_string()))?;
                if bound.map(|b| b.function) != Some(function.clone()) {
                    return Err(AuthError::FunctionNotBound(function.to_string()).into());
                }
                self.module
                    .authenticate(&raw.sender, digest, envelope, now)
                    .map_err(|e| match e {
                        VerificationError::Rejected(auth) => RejectionReason::Authentication(auth),
                        other => RejectionReason::Aborted(other.to_string()),
                    })?;
            }
        }

        if raw.sequence_number != account.sequence_number {
            return Err(RejectionReason::SequenceNumber {
                expected: account.sequence_number,
                got: raw.sequence_number,
            });
        }
        Ok(())
    }

    /// Apply the payload. Returns the abort reason on failure.
    fn execute(&self, state: &mut LedgerState, txn: &SignedTransaction) -> Result<(), RejectionReason> {
        let sender = txn.raw.sender;
        let now = self.clock.now();
        let abort = |e: &dyn std::fmt::Display| RejectionReason::Aborted(e.to_string());

        match &txn.raw.payload {
            Payload::EnableAbstraction { function } => {
                if function != self.module.authenticate_fn() {
                    return Err(RejectionReason::Aborted(format!("function {function} is not published")));
                }
                let binding = AuthenticationBinding {
                    owner: sender,
                    function: function.clone(),
                };
                match self.bindings.bind_if_absent(&binding).map_err(|e| abort(&e))? {
                    BindOutcome::Bound => {}
                    BindOutcome::Existing(existing) if existing.function == *function => {}
                    BindOutcome::Existing(existing) => {
                        return Err(RejectionReason::Aborted(format!(
                            "account already bound to {}",
                            existing.function
                        )));
                    }
                }
            }
            Payload::DelegateForSeconds {
                entry,
                delegate_public_key,
                seconds,
            } => {
                if entry != self.module.delegate_fn() {
                    return Err(RejectionReason::Aborted(format!("function {entry} is not published")));
                }
                self.module
                    .delegate_for_seconds(&sender, *delegate_public_key, *seconds, now)
                    .map_err(|e| abort(&e))?;
            }
            Payload::RevokeDelegation { entry } => {
                if entry != self.module.revoke_fn() {
                    return Err(RejectionReason::Aborted(format!("function {entry} is not published")));
                }
                self.module.revoke(&sender).map_err(|e| abort(&e))?;
            }
            Payload::Transfer { to, amount } => {
                let available = state.accounts.get(&sender).map(|a| a.balance).unwrap_or(0);
                if available < *amount {
                    return Err(RejectionReason::InsufficientBalance {
                        needed: *amount,
                        available,
                    });
                }
                state.accounts.entry(sender).or_default().balance -= amount;
                let recipient = state.accounts.entry(*to).or_default();
                recipient.balance = recipient.balance.saturating_add(*amount);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerClient for NullLedger {
    async fn sequence_number(&self, account: &AccountAddress) -> Result<u64, LedgerError> {
        Ok(self
            .lock()?
            .accounts
            .get(account)
            .map(|a| a.sequence_number)
            .unwrap_or(0))
    }

    async fn balance(&self, account: &AccountAddress) -> Result<u64, LedgerError> {
        Ok(self.lock()?.accounts.get(account).map(|a| a.balance).unwrap_or(0))
    }

    async fn submit(&self, txn: &SignedTransaction) -> Result<PendingTransaction, LedgerError> {
        self.submissions.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.fail_next_submit.lock().ok().and_then(|mut f| f.take()) {
            return Err(LedgerError::Transport(message));
        }

        let hash = txn.hash()?;
        let pending = PendingTransaction {
            hash,
            sender: txn.raw.sender,
            sequence_number: txn.raw.sequence_number,
        };

        let mut state = self.lock()?;
        if state.committed.contains_key(&hash) {
            tracing::debug!(%hash, "duplicate submission");
            return Ok(pending);
        }

        let digest = txn.raw.signing_digest()?;
        let account = state.accounts.get(&txn.raw.sender).cloned().unwrap_or_default();
        if let Err(reason) = self.prologue(txn, &digest, &account) {
            tracing::debug!(%hash, %reason, "transaction rejected");
            return Err(LedgerError::Rejected { hash, reason });
        }

        state.accounts.entry(txn.raw.sender).or_default().sequence_number += 1;
        let status = match self.execute(&mut state, txn) {
            Ok(()) => ExecutionStatus::Success,
            Err(reason) => {
                tracing::debug!(%hash, %reason, "transaction aborted");
                ExecutionStatus::Aborted(reason)
            }
        };
        state.next_version += 1;
        let version = state.next_version;
        state.committed.insert(
            hash,
            CommittedTransaction {
                hash,
                version,
                status,
            },
        );
        Ok(pending)
    }

    async fn wait_for_transaction(
        &self,
        pending: &PendingTransaction,
    ) -> Result<CommittedTransaction, LedgerError> {
        let committed = self
            .lock()?
            .committed
            .get(&pending.hash)
            .cloned()
            .ok_or(LedgerError::UnknownTransaction(pending.hash))?;

        if self.hang_confirmations.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        let delay = self
            .confirmation_delay
            .lock()
            .map(|d| *d)
            .unwrap_or(Duration::ZERO);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok(committed)
    }

    async fn fund_account(&self, account: &AccountAddress, amount: u64) -> Result<(), LedgerError> {
        if !self.network.has_faucet() {
            return Err(LedgerError::FaucetUnavailable(self.network));
        }
        let mut state = self.lock()?;
        let entry = state.accounts.entry(*account).or_default();
        entry.balance = entry.balance.saturating_add(amount);
        tracing::debug!(%account, amount, "faucet funded account");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NullClock;
    use aegis_ledger::{submit_and_confirm, TransactionFactory};
    use aegis_signer::{AbstractedSigner, KeySigner, LocalAccount, TransactionSigner};

    struct Fixture {
        clock: Arc<NullClock>,
        ledger: NullLedger,
        factory: TransactionFactory,
        owner: LocalAccount,
    }

    fn fixture() -> Fixture {
        let clock = Arc::new(NullClock::new(1_000));
        let ledger = NullLedger::new(
            NetworkId::Local,
            AccountAddress::from_hex_literal("0xa11ce").unwrap(),
            clock.clone(),
        );
        let factory = TransactionFactory::new(NetworkId::Local, clock.clone());
        Fixture {
            clock,
            ledger,
            factory,
            owner: LocalAccount::generate(),
        }
    }

    impl Fixture {
        async fn send(
            &self,
            signer: &dyn TransactionSigner,
            payload: Payload,
        ) -> Result<CommittedTransaction, LedgerError> {
            let seq = self.ledger.sequence_number(&signer.address()).await?;
            let txn = self.factory.raw(signer.address(), seq, payload).sign(signer)?;
            submit_and_confirm(&self.ledger, &txn, Duration::from_secs(5)).await
        }

        fn enable(&self) -> Payload {
            Payload::EnableAbstraction {
                function: self.ledger.module().authenticate_fn().clone(),
            }
        }

        fn delegate(&self, key: aegis_types::PublicKey, seconds: u64) -> Payload {
            Payload::DelegateForSeconds {
                entry: self.ledger.module().delegate_fn().clone(),
                delegate_public_key: key,
                seconds,
            }
        }
    }

    #[tokio::test]
    async fn transfer_moves_funds_and_bumps_sequence() {
        let f = fixture();
        f.ledger.fund_account(&f.owner.address(), 10).await.unwrap();
        let to = AccountAddress::new([3u8; 32]);

        f.send(&f.owner, Payload::Transfer { to, amount: 4 }).await.unwrap();

        assert_eq!(f.ledger.balance(&f.owner.address()).await.unwrap(), 6);
        assert_eq!(f.ledger.balance(&to).await.unwrap(), 4);
        assert_eq!(f.ledger.sequence_number(&f.owner.address()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn overdraft_aborts_but_consumes_sequence() {
        let f = fixture();
        let err = f
            .send(&f.owner, Payload::Transfer {
                to: AccountAddress::ZERO,
                amount: 1,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Rejected {
                reason: RejectionReason::InsufficientBalance { needed: 1, available: 0 },
                ..
            }
        ));
        assert_eq!(f.ledger.sequence_number(&f.owner.address()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn duplicate_submission_is_deduplicated() {
        let f = fixture();
        let txn = f
            .factory
            .raw(f.owner.address(), 0, f.enable())
            .sign(&f.owner)
            .unwrap();
        let a = f.ledger.submit(&txn).await.unwrap();
        let b = f.ledger.submit(&txn).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(f.ledger.committed_count(), 1);
        assert_eq!(f.ledger.submissions(), 2);
    }

    #[tokio::test]
    async fn delegated_transfer_lifecycle() {
        let f = fixture();
        f.ledger.fund_account(&f.owner.address(), 100).await.unwrap();
        f.send(&f.owner, f.enable()).await.unwrap();

        let delegate = Arc::new(KeySigner::generate());
        f.send(&f.owner, f.delegate(delegate.keys().public, 600)).await.unwrap();

        let signer = AbstractedSigner::new(
            f.owner.address(),
            f.ledger.module().authenticate_fn().clone(),
            delegate,
        );
        let owner = f.owner.address();
        f.send(&signer, Payload::Transfer { to: owner, amount: 1 }).await.unwrap();

        f.clock.advance(601);
        let err = f
            .send(&signer, Payload::Transfer { to: owner, amount: 1 })
            .await
            .unwrap_err();
        assert_eq!(err.auth_rejection(), Some(&AuthError::NoActiveDelegation));
    }

    #[tokio::test]
    async fn abstraction_requires_binding() {
        let f = fixture();
        let signer = AbstractedSigner::new(
            f.owner.address(),
            f.ledger.module().authenticate_fn().clone(),
            Arc::new(KeySigner::generate()),
        );
        let err = f
            .send(&signer, Payload::Transfer {
                to: AccountAddress::ZERO,
                amount: 0,
            })
            .await
            .unwrap_err();
        assert!(matches!(err.auth_rejection(), Some(AuthError::FunctionNotBound(_))));
    }

    #[tokio::test]
    async fn foreign_key_cannot_sign_for_owner() {
        let f = fixture();
        let intruder = LocalAccount::generate();
        let raw = f.factory.raw(f.owner.address(), 0, f.enable());
        let digest = raw.signing_digest().unwrap();
        let txn = SignedTransaction {
            raw,
            authenticator: intruder.authenticate(&digest).unwrap(),
        };
        let err = f.ledger.submit(&txn).await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Rejected {
                reason: RejectionReason::InvalidSignature,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn expired_transaction_is_rejected() {
        let f = fixture();
        let txn = f
            .factory
            .raw(f.owner.address(), 0, f.enable())
            .sign(&f.owner)
            .unwrap();
        f.clock.advance(TransactionFactory::DEFAULT_TTL_SECS);
        let err = f.ledger.submit(&txn).await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Rejected {
                reason: RejectionReason::Expired(_),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn mainnet_has_no_faucet() {
        let ledger = NullLedger::new(NetworkId::Mainnet, AccountAddress::ZERO, Arc::new(NullClock::new(0)));
        assert!(matches!(
            ledger.fund_account(&AccountAddress::ZERO, 1).await,
            Err(LedgerError::FaucetUnavailable(NetworkId::Mainnet))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_confirmation_times_out() {
        let f = fixture();
        f.ledger.hang_confirmations(true);
        let err = f.send(&f.owner, f.enable()).await.unwrap_err();
        assert!(matches!(err, LedgerError::ConfirmationTimeout { .. }));
        // The transaction itself committed.
        assert!(f.ledger.binding(&f.owner.address()).unwrap().is_some());
    }

    #[tokio::test]
    async fn injected_submit_failure_is_transient() {
        let f = fixture();
        f.ledger.fail_next_submit("connection reset");
        let err = f.send(&f.owner, f.enable()).await.unwrap_err();
        assert!(err.is_transient());
        f.send(&f.owner, f.enable()).await.unwrap();
    }
}
