//! The ledger client contract and bounded confirmation helpers.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use aegis_signer::TransactionSigner;
use aegis_types::{AccountAddress, TxHash};

use crate::error::{LedgerError, RejectionReason};
use crate::transaction::{Payload, SignedTransaction, TransactionFactory};

/// Handle returned once the ledger has *accepted* a transaction.
///
/// Acceptance is not commitment; see [`LedgerClient::wait_for_transaction`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTransaction {
    pub hash: TxHash,
    pub sender: AccountAddress,
    pub sequence_number: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    Success,
    Aborted(RejectionReason),
}

/// A transaction durably written to the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommittedTransaction {
    pub hash: TxHash,
    /// Position in the ledger's global order.
    pub version: u64,
    pub status: ExecutionStatus,
}

impl CommittedTransaction {
    pub fn is_success(&self) -> bool {
        matches!(self.status, ExecutionStatus::Success)
    }
}

/// Everything the delegation flow needs from a ledger.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Next sequence number the ledger expects from `account`.
    async fn sequence_number(&self, account: &AccountAddress) -> Result<u64, LedgerError>;

    async fn balance(&self, account: &AccountAddress) -> Result<u64, LedgerError>;

    /// Hand a signed transaction to the ledger.
    ///
    /// Submitting the exact same transaction twice returns the same handle.
    async fn submit(&self, txn: &SignedTransaction) -> Result<PendingTransaction, LedgerError>;

    /// Suspend until the transaction is committed (successfully or not).
    ///
    /// Unbounded; callers go through [`confirm`] to get a deadline.
    async fn wait_for_transaction(
        &self,
        pending: &PendingTransaction,
    ) -> Result<CommittedTransaction, LedgerError>;

    /// Mint test funds. Only dev/test networks support this.
    async fn fund_account(&self, account: &AccountAddress, amount: u64) -> Result<(), LedgerError>;
}

/// Wait for `pending` to commit, for at most `timeout`.
///
/// A committed-but-aborted transaction is an error. Nothing is retried.
pub async fn confirm(
    client: &dyn LedgerClient,
    pending: &PendingTransaction,
    timeout: Duration,
) -> Result<CommittedTransaction, LedgerError> {
    let committed = match tokio::time::timeout(timeout, client.wait_for_transaction(pending)).await {
        Ok(result) => result?,
        Err(_) => {
            tracing::warn!(hash = %pending.hash, ?timeout, "confirmation timed out");
            return Err(LedgerError::ConfirmationTimeout {
                hash: pending.hash,
                waited: timeout,
            });
        }
    };

    match committed.status {
        ExecutionStatus::Success => {
            tracing::debug!(hash = %committed.hash, version = committed.version, "transaction committed");
            Ok(committed)
        }
        ExecutionStatus::Aborted(reason) => Err(LedgerError::Rejected {
            hash: committed.hash,
            reason,
        }),
    }
}

/// Submit `txn` and wait (bounded) for it to commit successfully.
pub async fn submit_and_confirm(
    client: &dyn LedgerClient,
    txn: &SignedTransaction,
    timeout: Duration,
) -> Result<CommittedTransaction, LedgerError> {
    let pending = client.submit(txn).await?;
    tracing::debug!(
        hash = %pending.hash,
        sender = %pending.sender,
        seq = pending.sequence_number,
        kind = txn.raw.payload.kind(),
        "transaction submitted"
    );
    confirm(client, &pending, timeout).await
}

/// Build and sign a transaction for `signer`'s account at its current
/// sequence number.
pub async fn build_signed(
    client: &dyn LedgerClient,
    factory: &TransactionFactory,
    signer: &dyn TransactionSigner,
    payload: Payload,
) -> Result<SignedTransaction, LedgerError> {
    let sender = signer.address();
    let sequence_number = client.sequence_number(&sender).await?;
    factory.raw(sender, sequence_number, payload).sign(signer)
}
