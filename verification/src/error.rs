use aegis_store::StoreError;
use aegis_types::{AuthError, GrantError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VerificationError {
    #[error(transparent)]
    Rejected(#[from] AuthError),

    #[error("invalid grant: {0}")]
    Grant(#[from] GrantError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl VerificationError {
    /// The routine's verdict, if this is a rejection rather than an
    /// infrastructure failure.
    pub fn rejection(&self) -> Option<&AuthError> {
        match self {
            Self::Rejected(e) => Some(e),
            _ => None,
        }
    }
}
