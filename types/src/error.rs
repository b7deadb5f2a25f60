//! Error types shared across crates.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reasons the delegated-signer authentication routine rejects a transaction.
///
/// These never succeed on retry: the caller has to change the envelope, the
/// grant, or the sender.
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum AuthError {
    #[error("authenticator envelope is malformed: {0}")]
    MalformedEnvelope(String),

    #[error("sender has no active delegation")]
    NoActiveDelegation,

    #[error("envelope key does not match the delegated key")]
    DelegateMismatch,

    #[error("envelope signature does not verify over the digest")]
    BadSignature,

    #[error("sender has not bound authentication function {0}")]
    FunctionNotBound(String),
}

/// Failures parsing textual forms of the shared types.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("invalid account address: {0}")]
    Address(String),

    #[error("invalid function reference: {0}")]
    Function(String),

    #[error("unknown network: {0}")]
    Network(String),

    #[error("invalid key material: {0}")]
    Key(String),
}
