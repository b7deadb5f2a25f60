use std::time::Duration;

use aegis_signer::SignerError;
use aegis_types::{AccountAddress, AuthError, NetworkId, Timestamp, TxHash};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why the ledger refused or aborted a transaction.
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum RejectionReason {
    #[error(transparent)]
    Authentication(#[from] AuthError),

    #[error("signature does not match sender")]
    InvalidSignature,

    #[error("sequence number {got} does not match expected {expected}")]
    SequenceNumber { expected: u64, got: u64 },

    #[error("transaction expired at {0}")]
    Expired(Timestamp),

    #[error("transaction is for network {got}, ledger is {expected}")]
    WrongNetwork { expected: NetworkId, got: NetworkId },

    #[error("insufficient balance: need {needed}, have {available}")]
    InsufficientBalance { needed: u64, available: u64 },

    #[error("execution aborted: {0}")]
    Aborted(String),
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("transaction {hash} rejected: {reason}")]
    Rejected { hash: TxHash, reason: RejectionReason },

    #[error("no confirmation for {hash} within {waited:?}")]
    ConfirmationTimeout { hash: TxHash, waited: Duration },

    #[error("unknown transaction {0}")]
    UnknownTransaction(TxHash),

    #[error("faucet is not available on {0}")]
    FaucetUnavailable(NetworkId),

    #[error("signer for {signer} cannot sign a transaction sent by {sender}")]
    SignerMismatch {
        signer: AccountAddress,
        sender: AccountAddress,
    },

    #[error("signing error: {0}")]
    Signer(#[from] SignerError),

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("transport error: {0}")]
    Transport(String),
}

impl LedgerError {
    /// The authentication-routine rejection behind this error, if any.
    pub fn auth_rejection(&self) -> Option<&AuthError> {
        match self {
            Self::Rejected {
                reason: RejectionReason::Authentication(e),
                ..
            } => Some(e),
            _ => None,
        }
    }

    /// Timeouts and transport failures may succeed on a fresh attempt;
    /// ledger rejections will not.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ConfirmationTimeout { .. } | Self::Transport(_))
    }
}
