use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SignerError {
    #[error("digest must be {expected} bytes, got {actual}")]
    InvalidDigest { expected: usize, actual: usize },

    #[error("signing failed: {0}")]
    SigningFailure(String),
}
