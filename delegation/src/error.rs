use aegis_ledger::LedgerError;
use aegis_orchestrator::OrchestratorError;
use aegis_signer::SignerError;
use aegis_store::StoreError;
use aegis_types::{AccountAddress, FunctionRef, GrantError, ParseError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DelegationError {
    #[error("account {0} has not enabled the delegated-signer routine")]
    AbstractionNotEnabled(AccountAddress),

    #[error("account {owner} is already bound to {existing}")]
    AlreadyEnabled {
        owner: AccountAddress,
        existing: FunctionRef,
    },

    #[error("account {0} has no active delegation")]
    NoActiveDelegation(AccountAddress),

    #[error("delegate key is not the key delegated by {0}")]
    DelegateMismatch(AccountAddress),

    #[error("invalid delegation: {0}")]
    Grant(#[from] GrantError),

    #[error("invalid routine reference: {0}")]
    Function(#[from] ParseError),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("signer error: {0}")]
    Signer(#[from] SignerError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl From<OrchestratorError<DelegationError>> for DelegationError {
    fn from(e: OrchestratorError<DelegationError>) -> Self {
        e.into_cause()
    }
}

impl DelegationError {
    /// The ledger error behind this failure, if any.
    pub fn ledger(&self) -> Option<&LedgerError> {
        match self {
            Self::Ledger(e) => Some(e),
            _ => None,
        }
    }
}
