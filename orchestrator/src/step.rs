//! The unit of orchestration.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use aegis_ledger::{
    build_signed, confirm, CommittedTransaction, LedgerClient, LedgerError, Payload,
    PendingTransaction, SignedTransaction, TransactionFactory,
};
use aegis_signer::TransactionSigner;

/// Result of [`Step::build`].
#[derive(Debug)]
pub enum Prepared {
    /// Submit this and wait for it to commit.
    Submit(SignedTransaction),
    /// Nothing to do; the step's effect is already in place.
    Skip,
}

/// What a finished step produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    Committed(CommittedTransaction),
    Skipped,
}

impl StepOutcome {
    pub fn committed(&self) -> Option<&CommittedTransaction> {
        match self {
            Self::Committed(c) => Some(c),
            Self::Skipped => None,
        }
    }
}

/// One state-changing ledger operation.
///
/// Only [`build`](Step::build) is required; the other phases default to the
/// plain ledger calls.
#[async_trait]
pub trait Step: Send + Sync {
    type Error: std::error::Error + From<LedgerError> + Send + Sync + 'static;

    /// Name used in logs and in abort errors.
    fn label(&self) -> String;

    /// Check preconditions and produce the signed transaction.
    async fn build(&self, ledger: &dyn LedgerClient) -> Result<Prepared, Self::Error>;

    async fn submit(
        &self,
        ledger: &dyn LedgerClient,
        txn: &SignedTransaction,
    ) -> Result<PendingTransaction, Self::Error> {
        Ok(ledger.submit(txn).await?)
    }

    async fn await_confirmation(
        &self,
        ledger: &dyn LedgerClient,
        pending: &PendingTransaction,
        timeout: Duration,
    ) -> Result<CommittedTransaction, Self::Error> {
        Ok(confirm(ledger, pending, timeout).await?)
    }

    /// Called once the transaction has committed successfully.
    async fn finalize(&self, _committed: &CommittedTransaction) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Called when a phase after a successful `build` fails. Releases
    /// anything `build` acquired.
    fn abort(&self) {}
}

/// Sign `payload` as `signer` at the sender's current sequence number.
pub struct TransactionStep<E = LedgerError> {
    label: String,
    signer: Arc<dyn TransactionSigner>,
    factory: TransactionFactory,
    payload: Payload,
    _error: PhantomData<fn() -> E>,
}

impl<E> TransactionStep<E> {
    pub fn new(
        label: impl Into<String>,
        signer: Arc<dyn TransactionSigner>,
        factory: TransactionFactory,
        payload: Payload,
    ) -> Self {
        Self {
            label: label.into(),
            signer,
            factory,
            payload,
            _error: PhantomData,
        }
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }
}

#[async_trait]
impl<E> Step for TransactionStep<E>
where
    E: std::error::Error + From<LedgerError> + Send + Sync + 'static,
{
    type Error = E;

    fn label(&self) -> String {
        self.label.clone()
    }

    async fn build(&self, ledger: &dyn LedgerClient) -> Result<Prepared, E> {
        let txn = build_signed(ledger, &self.factory, self.signer.as_ref(), self.payload.clone()).await?;
        Ok(Prepared::Submit(txn))
    }
}
